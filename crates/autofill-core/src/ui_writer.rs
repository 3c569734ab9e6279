/// Interface for UI output operations
/// This trait abstracts all UI operations to allow different implementations
/// (console, tests, etc.) without coupling the core logic to specific output methods.
pub trait UiWriter: Send + Sync {
    /// Print a system prompt section
    fn print_system_prompt(&self, prompt: &str);

    /// Print a tool execution header
    fn print_tool_header(&self, tool_name: &str, tool_args: Option<&serde_json::Value>);

    /// Print a tool argument
    fn print_tool_arg(&self, key: &str, value: &str);

    /// Print tool output header
    fn print_tool_output_header(&self);

    /// Print a tool output line
    fn print_tool_output_line(&self, line: &str);

    /// Print tool output summary (when output is truncated)
    fn print_tool_output_summary(&self, hidden_count: usize);

    /// Print tool execution timing
    fn print_tool_timing(&self, duration_str: &str);

    /// Print the model's text for a turn
    fn print_agent_response(&self, content: &str);

    /// Returns true if this UI writer wants full, untruncated output
    /// Default is false (truncate for human readability)
    fn wants_full_output(&self) -> bool {
        false
    }
}

/// A no-op implementation for when UI output is not needed
pub struct NullUiWriter;

impl UiWriter for NullUiWriter {
    fn print_system_prompt(&self, _prompt: &str) {}
    fn print_tool_header(&self, _tool_name: &str, _tool_args: Option<&serde_json::Value>) {}
    fn print_tool_arg(&self, _key: &str, _value: &str) {}
    fn print_tool_output_header(&self) {}
    fn print_tool_output_line(&self, _line: &str) {}
    fn print_tool_output_summary(&self, _hidden_count: usize) {}
    fn print_tool_timing(&self, _duration_str: &str) {}
    fn print_agent_response(&self, _content: &str) {}
}
