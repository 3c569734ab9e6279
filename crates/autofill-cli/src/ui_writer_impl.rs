use autofill_core::ui_writer::UiWriter;
use std::io::{self, Write};
use std::sync::Mutex;

/// Console implementation of UiWriter that prints to stdout
pub struct ConsoleUiWriter {
    current_tool_name: Mutex<Option<String>>,
    current_tool_args: Mutex<Vec<(String, String)>>,
}

impl ConsoleUiWriter {
    pub fn new() -> Self {
        Self {
            current_tool_name: Mutex::new(None),
            current_tool_args: Mutex::new(Vec::new()),
        }
    }
}

impl Default for ConsoleUiWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// First line of `value`, cut to 80 chars.
fn display_value(value: &str) -> String {
    let first_line = value.lines().next().unwrap_or("");
    if first_line.chars().count() > 80 {
        let truncated: String = first_line.chars().take(77).collect();
        format!("{}...", truncated)
    } else {
        first_line.to_string()
    }
}

impl UiWriter for ConsoleUiWriter {
    fn print_system_prompt(&self, prompt: &str) {
        println!("🔍 System Prompt:");
        println!("================");
        println!("{}", prompt);
        println!("================");
        println!();
    }

    fn print_tool_header(&self, tool_name: &str, _tool_args: Option<&serde_json::Value>) {
        if let Ok(mut name) = self.current_tool_name.lock() {
            *name = Some(tool_name.to_string());
        }
        if let Ok(mut args) = self.current_tool_args.lock() {
            args.clear();
        }
    }

    fn print_tool_arg(&self, key: &str, value: &str) {
        if let Ok(mut args) = self.current_tool_args.lock() {
            args.push((key.to_string(), value.to_string()));
        }
    }

    fn print_tool_output_header(&self) {
        println!();
        let name = self
            .current_tool_name
            .lock()
            .ok()
            .and_then(|name| name.clone());
        let Some(tool_name) = name else {
            return;
        };

        let args = self
            .current_tool_args
            .lock()
            .map(|args| args.clone())
            .unwrap_or_default();
        match args.first() {
            Some((_, value)) => println!(
                "┌─\x1b[1;32m {}\x1b[0m\x1b[35m | {}\x1b[0m",
                tool_name,
                display_value(value)
            ),
            None => println!("┌─\x1b[1;32m {}\x1b[0m", tool_name),
        }
    }

    fn print_tool_output_line(&self, line: &str) {
        println!("│ \x1b[2m{}\x1b[0m", line);
    }

    fn print_tool_output_summary(&self, count: usize) {
        println!(
            "│ \x1b[2m({} line{})\x1b[0m",
            count,
            if count == 1 { "" } else { "s" }
        );
    }

    fn print_tool_timing(&self, duration_str: &str) {
        // Yellow from one second up
        let slow = duration_str
            .strip_suffix('s')
            .and_then(|s| s.trim().parse::<f64>().ok())
            .is_some_and(|seconds| seconds >= 1.0);
        let color_code = if slow { "\x1b[33m" } else { "" };

        println!("└─ ⚡️ {}{}\x1b[0m", color_code, duration_str);
        println!();
        if let Ok(mut name) = self.current_tool_name.lock() {
            *name = None;
        }
        if let Ok(mut args) = self.current_tool_args.lock() {
            args.clear();
        }
    }

    fn print_agent_response(&self, content: &str) {
        println!("{}", content);
        let _ = io::stdout().flush();
    }
}
