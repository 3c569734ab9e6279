pub mod conversation;
pub mod error_handling;
pub mod prompts;
pub mod provider_registration;
pub mod task_result;
pub mod tool_definitions;
pub mod tool_dispatch;
pub mod tools;
pub mod ui_writer;
pub mod webdriver_session;

pub use autofill_providers::{Message, MessageRole, ToolCall};
pub use conversation::{Conversation, ConversationError, ConversationState};
pub use error_handling::{AgentError, CapabilityFailure, ErrorContext, ToolError, FAILURE_MARKER};
pub use task_result::TaskResult;
pub use tool_dispatch::{dispatch_tool, invoke, ToolRequest};
pub use tools::{Collaborators, ToolContext};

use std::time::{Duration, Instant};

use anyhow::Result;
use autofill_config::Config;
use autofill_providers::{CompletionRequest, LLMProvider, ProviderRegistry};
use tracing::{debug, info};

use crate::tool_definitions::create_tool_definitions;
use crate::ui_writer::UiWriter;

const MAX_OUTPUT_LINES: usize = 5;
const MAX_LINE_WIDTH: usize = 80;
const MAX_ARG_WIDTH: usize = 100;

pub struct Agent<W: UiWriter> {
    providers: ProviderRegistry,
    config: Config,
    ui_writer: W,
    collaborators: Collaborators,
    tool_call_metrics: Vec<(String, Duration, bool)>, // (tool_name, duration, success)
}

impl<W: UiWriter> Agent<W> {
    /// Build an agent with the configured providers and the real collaborators.
    pub fn new(config: Config, ui_writer: W) -> Result<Self> {
        let providers = provider_registration::register_providers(&config)?;
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::with_parts(config, ui_writer, providers, collaborators))
    }

    pub fn with_parts(
        config: Config,
        ui_writer: W,
        providers: ProviderRegistry,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            providers,
            config,
            ui_writer,
            collaborators,
            tool_call_metrics: Vec::new(),
        }
    }

    pub fn get_tool_call_metrics(&self) -> &Vec<(String, Duration, bool)> {
        &self.tool_call_metrics
    }

    /// (provider name, model) of the provider driving the loop
    pub fn get_provider_info(&self) -> Result<(String, String)> {
        let provider = self.providers.get(None)?;
        Ok((provider.name().to_string(), provider.model().to_string()))
    }

    /// Provider for model calls made inside tools, falling back to the default.
    fn tools_provider(&self) -> Result<&dyn LLMProvider> {
        let reference = self.config.get_tools_provider();
        self.providers
            .get(Some(reference))
            .or_else(|_| self.providers.get(None))
    }

    /// Drive the conversation until the model answers without requesting tools.
    ///
    /// Each turn sends the whole history (system prompt first) with the tool
    /// definitions attached. Every tool call in a reply is validated before
    /// any of them runs; they then run one after another and their results
    /// are appended together, in request order.
    pub async fn run(
        &mut self,
        initial_prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<TaskResult, AgentError> {
        let system_prompt = system_prompt
            .map(str::to_string)
            .unwrap_or_else(|| prompts::build_system_prompt(&self.config));
        let mut conversation = Conversation::new(Some(system_prompt));
        conversation.push_user(initial_prompt)?;

        let tool_definitions = create_tool_definitions();
        let max_turns = self.config.agent.max_turns;
        let mut turn: u32 = 0;
        if max_turns == 0 {
            return Err(AgentError::MaxTurnsExceeded { max_turns });
        }

        loop {
            turn += 1;
            let (provider_name, model) = self.get_provider_info().map_err(AgentError::Provider)?;
            debug!("Turn {} with {} ({})", turn, provider_name, model);

            let request = CompletionRequest::new(conversation.request_messages())
                .with_tools(tool_definitions.clone());
            let completion = match self.providers.get(None) {
                Ok(provider) => provider.complete(request).await,
                Err(e) => Err(e),
            };
            let response = match completion {
                Ok(response) => response,
                Err(e) => {
                    let err = AgentError::Provider(e);
                    ErrorContext::new(
                        "completion",
                        &provider_name,
                        &model,
                        turn,
                        conversation.last_user_prompt().unwrap_or_default(),
                    )
                    .log_error(&err);
                    return Err(err);
                }
            };
            debug!(
                "Model returned {} chars and {} tool call(s)",
                response.content.len(),
                response.tool_calls.len()
            );

            if !response.content.trim().is_empty() {
                self.ui_writer.print_agent_response(&response.content);
            }

            let tool_calls = response.tool_calls;
            // Reused call ids are rejected here, before any tool in the batch runs
            let state = match conversation.push_assistant(response.content, tool_calls.clone()) {
                Ok(state) => state,
                Err(e) => {
                    let err = AgentError::Conversation(e);
                    ErrorContext::new(
                        "assistant message",
                        &provider_name,
                        &model,
                        turn,
                        conversation.last_user_prompt().unwrap_or_default(),
                    )
                    .log_error(&err);
                    return Err(err);
                }
            };
            if state == ConversationState::Terminal {
                let response = conversation.final_text().unwrap_or_default().to_string();
                info!("Task finished after {} turn(s)", turn);
                return Ok(TaskResult::new(response, turn, conversation));
            }

            // Validate the whole batch before running any of it
            let requests = match tool_calls
                .iter()
                .map(|call| ToolRequest::from_call(call).map(|request| (call, request)))
                .collect::<Result<Vec<_>, ToolError>>()
            {
                Ok(requests) => requests,
                Err(e) => {
                    let err = AgentError::Tool(e);
                    ErrorContext::new(
                        "tool validation",
                        &provider_name,
                        &model,
                        turn,
                        conversation.last_user_prompt().unwrap_or_default(),
                    )
                    .log_error(&err);
                    return Err(err);
                }
            };

            if turn >= max_turns {
                let err = AgentError::MaxTurnsExceeded { max_turns };
                ErrorContext::new(
                    "turn limit",
                    &provider_name,
                    &model,
                    turn,
                    conversation.last_user_prompt().unwrap_or_default(),
                )
                .log_error(&err);
                return Err(err);
            }

            let results = self.execute_batch(&requests).await?;
            conversation.push_tool_results(results)?;
        }
    }

    /// Run validated requests in order, returning `(call id, output)` pairs.
    async fn execute_batch(
        &mut self,
        requests: &[(&ToolCall, ToolRequest)],
    ) -> Result<Vec<(String, String)>, AgentError> {
        let provider = self.tools_provider().map_err(AgentError::Provider)?;
        let ctx = ToolContext {
            config: &self.config,
            ui_writer: &self.ui_writer,
            provider,
            collaborators: &self.collaborators,
        };

        let mut results = Vec::with_capacity(requests.len());
        let mut metrics = Vec::with_capacity(requests.len());

        for (call, request) in requests {
            print_tool_call(&self.ui_writer, call);
            let (arg_name, arg_value) = request.argument();
            info!("Running {}", request.tool_name());
            debug!("{} {}={}", request.tool_name(), arg_name, clip(arg_value, MAX_ARG_WIDTH));

            let exec_start = Instant::now();
            let output = dispatch_tool(request, &ctx).await;
            let exec_duration = exec_start.elapsed();

            let success = !output.starts_with(FAILURE_MARKER);
            info!(
                "{} {} in {:.2}s",
                request.tool_name(),
                if success { "finished" } else { "failed" },
                exec_duration.as_secs_f64()
            );
            print_tool_output(&self.ui_writer, &output);
            self.ui_writer
                .print_tool_timing(&format!("{:.1}s", exec_duration.as_secs_f64()));

            metrics.push((request.tool_name().to_string(), exec_duration, success));
            results.push((call.id.clone(), output));
        }

        self.tool_call_metrics.extend(metrics);
        Ok(results)
    }

    pub fn format_tool_stats(&self) -> String {
        let successful = self
            .tool_call_metrics
            .iter()
            .filter(|(_, _, success)| *success)
            .count();
        let total_duration: Duration = self
            .tool_call_metrics
            .iter()
            .map(|(_, duration, _)| *duration)
            .sum();

        format!(
            "🔧 {} tool call(s), {} succeeded, {} failed, {:.2}s total",
            self.tool_call_metrics.len(),
            successful,
            self.tool_call_metrics.len() - successful,
            total_duration.as_secs_f64()
        )
    }
}

fn print_tool_call<W: UiWriter>(ui_writer: &W, call: &ToolCall) {
    ui_writer.print_tool_header(&call.tool, Some(&call.args));
    if let Some(args_obj) = call.args.as_object() {
        for (key, value) in args_obj {
            let value_str = match value {
                serde_json::Value::String(s) => clip(s, MAX_ARG_WIDTH),
                _ => value.to_string(),
            };
            ui_writer.print_tool_arg(key, &value_str);
        }
    }
    ui_writer.print_tool_output_header();
}

fn print_tool_output<W: UiWriter>(ui_writer: &W, output: &str) {
    let wants_full = ui_writer.wants_full_output();
    let output_lines: Vec<&str> = output.lines().collect();

    for (idx, line) in output_lines.iter().enumerate() {
        if !wants_full && idx >= MAX_OUTPUT_LINES {
            break;
        }
        if wants_full {
            ui_writer.print_tool_output_line(line);
        } else {
            ui_writer.print_tool_output_line(&clip(line, MAX_LINE_WIDTH));
        }
    }

    if !wants_full && output_lines.len() > MAX_OUTPUT_LINES {
        ui_writer.print_tool_output_summary(output_lines.len());
    }
}

/// Truncate to `max_width` chars, respecting UTF-8 boundaries.
fn clip(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghijkl", 10), "abcdefg...");
        assert_eq!(clip("ééééééééééé", 5), "éé...");
    }
}
