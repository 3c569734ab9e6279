//! Error taxonomy for the agent loop and its tools.
//!
//! - [`ToolError`] covers requests the dispatcher refuses before running
//!   anything (unknown tool, bad arguments). These abort the run.
//! - [`CapabilityFailure`] covers collaborator failures inside a tool. These
//!   never propagate; they become the tool's result text.
//! - [`AgentError`] is what [`crate::Agent::run`] returns.

use tracing::error;

use crate::conversation::ConversationError;

/// Marker prefixed to every tool result that reports a failure.
pub const FAILURE_MARKER: &str = "❌";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArgument { tool: String, reason: String },
}

/// A collaborator failed while a tool was running.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("❌ {tool} failed: {message}")]
pub struct CapabilityFailure {
    pub tool: &'static str,
    pub message: String,
}

impl CapabilityFailure {
    pub fn new(tool: &'static str, message: impl Into<String>) -> Self {
        Self {
            tool,
            message: message.into(),
        }
    }

    /// Wrap an error, keeping its whole context chain in the message.
    pub fn from_error(tool: &'static str, err: &anyhow::Error) -> Self {
        Self::new(tool, format!("{:#}", err))
    }

    /// Text fed back to the model as the tool result
    pub fn to_tool_output(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Model call failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("Stopped after {max_turns} model turns without a final answer")]
    MaxTurnsExceeded { max_turns: u32 },

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Context attached to an error before it leaves the loop
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: String,
    pub provider: String,
    pub model: String,
    pub turn: u32,
    /// The last user prompt (truncated for logging)
    pub last_prompt: String,
}

impl ErrorContext {
    pub fn new(operation: &str, provider: &str, model: &str, turn: u32, last_prompt: &str) -> Self {
        Self {
            operation: operation.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            turn,
            last_prompt: truncate_for_logging(last_prompt, 1000),
        }
    }

    /// Log the error context with ERROR level
    pub fn log_error(&self, err: &dyn std::fmt::Display) {
        error!("=== AUTOFILL ERROR DETAILS ===");
        error!("Operation: {}", self.operation);
        error!("Provider: {} | Model: {}", self.provider, self.model);
        error!("Turn: {}", self.turn);
        error!("Error: {}", err);
        error!("Last Prompt: {}", self.last_prompt);
        error!("=== END ERROR DETAILS ===");
    }
}

/// Truncate on a char boundary and note how much was cut.
pub fn truncate_for_logging(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &s[..end], s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_failure_output_carries_marker() {
        let failure = CapabilityFailure::new("get_excel_data", "file not found");
        let output = failure.to_tool_output();
        assert!(output.starts_with(FAILURE_MARKER));
        assert!(output.contains("get_excel_data failed: file not found"));
    }

    #[test]
    fn test_capability_failure_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("GET http://localhost:8000");
        let failure = CapabilityFailure::from_error("enter_data", &err);
        assert!(failure.message.contains("GET http://localhost:8000"));
        assert!(failure.message.contains("connection refused"));
    }

    #[test]
    fn test_truncate_for_logging_respects_char_boundaries() {
        let s = "ééééé";
        let truncated = truncate_for_logging(s, 3);
        assert!(truncated.starts_with('é'));
        assert!(truncated.contains("truncated"));
        assert_eq!(truncate_for_logging("short", 10), "short");
    }

    #[test]
    fn test_tool_error_messages() {
        assert_eq!(
            ToolError::UnknownTool("nonexistent_tool".into()).to_string(),
            "Unknown tool: nonexistent_tool"
        );
        let err = ToolError::InvalidArgument {
            tool: "search_google".into(),
            reason: "missing field `query`".into(),
        };
        assert!(err.to_string().contains("missing field `query`"));
    }
}
