use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, MessageRole, ProviderError,
    ResponseFormat, Tool, ToolCall, Usage,
};

#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    name: String,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        Self::new_with_name(
            "openai".to_string(),
            api_key,
            model,
            base_url,
            max_tokens,
            temperature,
        )
    }

    pub fn new_with_name(
        name: String,
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o".to_string()),
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_tokens,
            temperature,
            name,
        })
    }

    fn create_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": convert_messages(&request.messages),
        });

        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            body["max_completion_tokens"] = json!(max_tokens);
        }

        // Omitted unless pinned by the caller or the config; some models reject the field.
        if let Some(temperature) = request.temperature.or(self.temperature) {
            body["temperature"] = json!(temperature);
        }

        if let Some(tools) = &request.tools {
            if !tools.is_empty() {
                body["tools"] = json!(convert_tools(tools));
            }
        }

        if let Some(ResponseFormat::JsonObject) = request.response_format {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            "Processing OpenAI completion request with {} messages",
            request.messages.len()
        );

        let body = self.create_request_body(&request);

        debug!("Sending request to OpenAI API: model={}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                provider: self.name.clone(),
                status: status.as_u16(),
                body: error_text,
            }
            .into());
        }

        let openai_response: OpenAIResponse = response.json().await?;
        parse_response(&self.name, &self.model, openai_response)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_response(
    provider: &str,
    model: &str,
    openai_response: OpenAIResponse,
) -> Result<CompletionResponse> {
    let choice = openai_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: provider.to_string(),
            reason: "response contained no choices".to_string(),
        })?;

    let content = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(OpenAIToolCall::into_tool_call)
        .collect();

    let usage = openai_response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    debug!(
        "OpenAI completion successful: {} tokens generated, {} tool calls",
        usage.completion_tokens,
        tool_calls.len()
    );

    Ok(CompletionResponse {
        content,
        tool_calls,
        usage,
        model: model.to_string(),
    })
}

fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|msg| match msg.role {
            MessageRole::System => json!({ "role": "system", "content": msg.content }),
            MessageRole::User => json!({ "role": "user", "content": msg.content }),
            MessageRole::Assistant if msg.has_tool_calls() => {
                let content = if msg.content.is_empty() {
                    serde_json::Value::Null
                } else {
                    json!(msg.content)
                };
                json!({
                    "role": "assistant",
                    "content": content,
                    "tool_calls": msg.tool_calls.iter().map(convert_tool_call).collect::<Vec<_>>(),
                })
            }
            MessageRole::Assistant => json!({ "role": "assistant", "content": msg.content }),
            MessageRole::Tool => json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id.as_deref().unwrap_or_default(),
                "content": msg.content,
            }),
        })
        .collect()
}

fn convert_tool_call(call: &ToolCall) -> serde_json::Value {
    // The API expects arguments as a JSON-encoded string.
    let arguments = match &call.args {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.tool,
            "arguments": arguments,
        }
    })
}

fn convert_tools(tools: &[Tool]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}

// OpenAI API response structures
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

impl OpenAIToolCall {
    /// Unparseable arguments are kept as the raw string so argument
    /// validation can report them.
    fn into_tool_call(self) -> ToolCall {
        let args = match serde_json::from_str(&self.function.arguments) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "Tool call {} has non-JSON arguments: {}",
                    self.function.name, e
                );
                serde_json::Value::String(self.function.arguments)
            }
        };
        ToolCall {
            id: self.id,
            tool: self.function.name,
            args,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
