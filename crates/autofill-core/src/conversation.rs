//! Append-only message log for one agent run.
//!
//! The system prompt is held outside the log and prepended to every model
//! request, so it is stored once no matter how many turns the run takes.

use std::collections::HashSet;

use autofill_providers::{Message, MessageRole, ToolCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Waiting for the next assistant message
    AwaitingModel,
    /// The last assistant message requested tools whose results are not in yet
    ExecutingTools,
    /// The last assistant message requested nothing; the run is over
    Terminal,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Tool result references unknown tool call id '{0}'")]
    UnknownToolCallId(String),

    #[error("Tool call '{0}' already has a result")]
    DuplicateToolResult(String),

    #[error("Tool call id '{0}' is used more than once")]
    DuplicateToolCallId(String),

    #[error("Tool results missing for calls {0:?}")]
    IncompleteToolResults(Vec<String>),

    #[error("Cannot {action} while the conversation is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: ConversationState,
    },
}

#[derive(Debug, Clone)]
pub struct Conversation {
    system_prompt: Option<String>,
    messages: Vec<Message>,
    state: ConversationState,
    /// Call ids from the latest assistant message still awaiting results
    pending_calls: Vec<String>,
    answered_calls: HashSet<String>,
}

impl Conversation {
    pub fn new(system_prompt: Option<String>) -> Self {
        Self {
            system_prompt,
            messages: Vec::new(),
            state: ConversationState::AwaitingModel,
            pending_calls: Vec::new(),
            answered_calls: HashSet::new(),
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Messages in append order, without the system prompt
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.expect_state(ConversationState::AwaitingModel, "add a user message")?;
        self.messages.push(Message::user(content));
        Ok(())
    }

    /// Record the model's reply and move to the next state.
    ///
    /// Call ids must be unique across the whole conversation; a reused id is
    /// rejected here, before any of the calls could run.
    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Result<ConversationState, ConversationError> {
        self.expect_state(ConversationState::AwaitingModel, "add an assistant message")?;

        let mut seen = HashSet::new();
        for call in &tool_calls {
            if self.answered_calls.contains(&call.id) || !seen.insert(call.id.as_str()) {
                return Err(ConversationError::DuplicateToolCallId(call.id.clone()));
            }
        }

        self.pending_calls = tool_calls.iter().map(|call| call.id.clone()).collect();
        self.state = if tool_calls.is_empty() {
            ConversationState::Terminal
        } else {
            ConversationState::ExecutingTools
        };
        self.messages.push(Message::assistant(content, tool_calls));
        Ok(self.state)
    }

    /// Append the results of one tool batch together, in the order given.
    ///
    /// Every result must answer a call from the latest assistant message, and
    /// every such call must be answered exactly once. Nothing is appended if
    /// any check fails.
    pub fn push_tool_results(
        &mut self,
        results: Vec<(String, String)>,
    ) -> Result<(), ConversationError> {
        self.expect_state(ConversationState::ExecutingTools, "add tool results")?;

        let mut seen = HashSet::new();
        for (call_id, _) in &results {
            if self.answered_calls.contains(call_id) || !seen.insert(call_id.as_str()) {
                return Err(ConversationError::DuplicateToolResult(call_id.clone()));
            }
            if !self.pending_calls.contains(call_id) {
                return Err(ConversationError::UnknownToolCallId(call_id.clone()));
            }
        }

        let missing: Vec<String> = self
            .pending_calls
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConversationError::IncompleteToolResults(missing));
        }

        for (call_id, output) in results {
            self.answered_calls.insert(call_id.clone());
            self.messages.push(Message::tool_result(call_id, output));
        }
        self.pending_calls.clear();
        self.state = ConversationState::AwaitingModel;
        Ok(())
    }

    /// The message list sent to the model: system prompt first, then the log.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }

    pub fn last_user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    /// Text of the final assistant message once the conversation is terminal
    pub fn final_text(&self) -> Option<&str> {
        if self.state != ConversationState::Terminal {
            return None;
        }
        self.messages.last().map(|m| m.content.as_str())
    }

    fn expect_state(
        &self,
        expected: ConversationState,
        action: &'static str,
    ) -> Result<(), ConversationError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConversationError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, tool: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            tool: tool.to_string(),
            args: json!({}),
        }
    }

    #[test]
    fn test_system_prompt_prepended_not_stored() {
        let mut conversation = Conversation::new(Some("be helpful".to_string()));
        conversation.push_user("hello").unwrap();

        assert_eq!(conversation.messages().len(), 1);
        let request = conversation.request_messages();
        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, MessageRole::System);
        assert_eq!(request[0].content, "be helpful");
        assert_eq!(request[1].content, "hello");
    }

    #[test]
    fn test_no_system_prompt() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("hello").unwrap();
        let request = conversation.request_messages();
        assert_eq!(request.len(), 1);
        assert_eq!(request[0].role, MessageRole::User);
    }

    #[test]
    fn test_state_transitions() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();
        assert_eq!(conversation.state(), ConversationState::AwaitingModel);

        let state = conversation
            .push_assistant("", vec![call("a", "get_excel_data")])
            .unwrap();
        assert_eq!(state, ConversationState::ExecutingTools);
        assert!(conversation.final_text().is_none());

        conversation
            .push_tool_results(vec![("a".to_string(), "rows".to_string())])
            .unwrap();
        assert_eq!(conversation.state(), ConversationState::AwaitingModel);

        let state = conversation.push_assistant("All done", vec![]).unwrap();
        assert_eq!(state, ConversationState::Terminal);
        assert_eq!(conversation.final_text(), Some("All done"));
    }

    #[test]
    fn test_tool_results_appended_in_given_order() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();
        conversation
            .push_assistant("", vec![call("a", "x"), call("b", "y"), call("c", "z")])
            .unwrap();
        conversation
            .push_tool_results(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ])
            .unwrap();

        let ids: Vec<&str> = conversation.messages()[2..]
            .iter()
            .map(|m| m.tool_call_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_tool_call_id_rejected_and_nothing_appended() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();
        conversation.push_assistant("", vec![call("a", "x")]).unwrap();

        let err = conversation
            .push_tool_results(vec![("zzz".to_string(), "out".to_string())])
            .unwrap_err();
        assert_eq!(err, ConversationError::UnknownToolCallId("zzz".to_string()));
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.state(), ConversationState::ExecutingTools);
    }

    #[test]
    fn test_duplicate_and_missing_results_rejected() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();
        conversation
            .push_assistant("", vec![call("a", "x"), call("b", "y")])
            .unwrap();

        let err = conversation
            .push_tool_results(vec![
                ("a".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string()),
            ])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateToolResult("a".to_string()));

        let err = conversation
            .push_tool_results(vec![("a".to_string(), "1".to_string())])
            .unwrap_err();
        assert_eq!(
            err,
            ConversationError::IncompleteToolResults(vec!["b".to_string()])
        );
    }

    #[test]
    fn test_results_for_an_earlier_batch_are_rejected() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();
        conversation.push_assistant("", vec![call("a", "x")]).unwrap();
        conversation
            .push_tool_results(vec![("a".to_string(), "1".to_string())])
            .unwrap();
        conversation.push_assistant("", vec![call("b", "x")]).unwrap();

        let err = conversation
            .push_tool_results(vec![("a".to_string(), "again".to_string())])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateToolResult("a".to_string()));
    }

    #[test]
    fn test_reused_call_ids_rejected_before_running() {
        let mut conversation = Conversation::new(None);
        conversation.push_user("task").unwrap();

        let err = conversation
            .push_assistant("", vec![call("a", "x"), call("a", "y")])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateToolCallId("a".to_string()));
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.state(), ConversationState::AwaitingModel);

        conversation.push_assistant("", vec![call("a", "x")]).unwrap();
        conversation
            .push_tool_results(vec![("a".to_string(), "1".to_string())])
            .unwrap();
        let err = conversation
            .push_assistant("", vec![call("a", "x")])
            .unwrap_err();
        assert_eq!(err, ConversationError::DuplicateToolCallId("a".to_string()));
    }

    #[test]
    fn test_out_of_order_transitions_rejected() {
        let mut conversation = Conversation::new(None);
        let err = conversation
            .push_tool_results(vec![("a".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConversationError::InvalidTransition { .. }));

        conversation.push_user("task").unwrap();
        conversation.push_assistant("done", vec![]).unwrap();
        assert!(conversation.push_user("more").is_err());
        assert!(conversation.push_assistant("again", vec![]).is_err());
    }

    #[test]
    fn test_last_user_prompt() {
        let mut conversation = Conversation::new(Some("sys".to_string()));
        assert!(conversation.last_user_prompt().is_none());
        conversation.push_user("find Acme").unwrap();
        assert_eq!(conversation.last_user_prompt(), Some("find Acme"));
    }
}
