//! Mock chat provider for testing
//!
//! A configurable provider that replays queued responses in order and
//! records every request it receives, so tests can drive the agent loop
//! deterministically and inspect exactly what was sent to the model.
//!
//! # Example
//!
//! ```rust,ignore
//! use autofill_providers::mock::{MockProvider, MockResponse};
//!
//! // Simple text-only response
//! let provider = MockProvider::new()
//!     .with_response(MockResponse::text("Done!"));
//!
//! // Response with a tool call, then a final answer
//! let provider = MockProvider::new().with_responses(vec![
//!     MockResponse::tool_call("get_excel_data", json!({"file_path": "/data/company.xlsx"})),
//!     MockResponse::text("Entered the address."),
//! ]);
//! ```

use crate::{CompletionRequest, CompletionResponse, LLMProvider, ToolCall, Usage};
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Global counter for generating unique tool call IDs
static TOOL_CALL_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_tool_call_id() -> String {
    format!("call_{}", TOOL_CALL_COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// A mock response that can be configured for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    /// Return an error instead of a response
    pub error: Option<String>,
}

impl MockResponse {
    /// Create a simple text-only response
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: Vec::new(),
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: content.len() as u32 / 4,
                total_tokens: 100 + content.len() as u32 / 4,
            },
            error: None,
        }
    }

    /// Create a response carrying a single tool call
    pub fn tool_call(tool: &str, args: serde_json::Value) -> Self {
        Self::tool_calls(vec![(tool, args)])
    }

    /// Create a response carrying several tool calls, in the given order
    pub fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> Self {
        let tool_calls = calls
            .into_iter()
            .map(|(tool, args)| ToolCall {
                id: String::new(),
                tool: tool.to_string(),
                args,
            })
            .collect();
        Self {
            content: String::new(),
            tool_calls,
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
            error: None,
        }
    }

    /// Create a text response whose content is the serialized JSON value
    pub fn json(value: serde_json::Value) -> Self {
        Self::text(&value.to_string())
    }

    /// Create a response that fails the completion call
    pub fn error(message: &str) -> Self {
        let mut response = Self::text("");
        response.error = Some(message.to_string());
        response
    }

    /// Builder: set the text that accompanies tool calls
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Builder: pin the tool call ids instead of generating fresh ones
    pub fn with_call_ids(mut self, ids: &[&str]) -> Self {
        for (call, id) in self.tool_calls.iter_mut().zip(ids) {
            call.id = id.to_string();
        }
        self
    }
}

/// A mock chat provider for testing
///
/// The provider maintains a queue of responses that are returned in order.
/// It also tracks all requests made for verification in tests.
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    /// Queue of responses to return (FIFO)
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// All requests received (for verification)
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Default response when queue is empty
    default_response: Option<MockResponse>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Add a response to the queue
    pub fn with_response(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Add multiple responses to the queue
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        self.responses.lock().unwrap().extend(responses);
        self
    }

    /// Set a default response when queue is empty
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = Some(response);
        self
    }

    /// Get all requests that were made to this provider
    pub fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the number of requests made
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.default_response
                .clone()
                .unwrap_or_else(|| MockResponse::text("Mock response (no responses configured)"))
        } else {
            responses.remove(0)
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);

        let mut response = self.next_response();
        if let Some(error) = response.error {
            anyhow::bail!("{}", error);
        }

        // Ids are generated per call so a repeated default response gets fresh ones
        for call in response.tool_calls.iter_mut().filter(|c| c.id.is_empty()) {
            call.id = next_tool_call_id();
        }

        Ok(CompletionResponse {
            content: response.content,
            tool_calls: response.tool_calls,
            usage: response.usage,
            model: self.model.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}
