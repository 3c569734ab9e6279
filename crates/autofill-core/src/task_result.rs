use crate::conversation::Conversation;

/// Result of a task execution containing both the response and the conversation
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// The model's final text
    pub response: String,
    /// Number of model calls the run made
    pub turns: u32,
    /// The complete conversation at the time of completion
    pub conversation: Conversation,
}

impl TaskResult {
    pub fn new(response: String, turns: u32, conversation: Conversation) -> Self {
        Self {
            response,
            turns,
            conversation,
        }
    }

    /// Number of tool results recorded during the run
    pub fn tool_result_count(&self) -> usize {
        self.conversation
            .messages()
            .iter()
            .filter(|m| m.tool_call_id.is_some())
            .count()
    }
}
