use async_trait::async_trait;

use crate::error::RunnerError;

/// Whether the next invocation starts a new conversation or continues the
/// previous one.
///
/// Only moves `Fresh -> Continuing`, and only from inside an assistant's own
/// `execute`. A new conversation needs a new assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Fresh,
    Continuing,
}

impl ConversationState {
    pub fn is_continuing(self) -> bool {
        matches!(self, ConversationState::Continuing)
    }
}

/// Something that turns a chat message into a reply.
///
/// `execute` takes `&mut self`, so an assistant never runs two invocations
/// at once; callers share it behind an async mutex.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    fn conversation_state(&self) -> ConversationState;

    /// Run one prompt to completion and return the trimmed reply text.
    async fn execute(&mut self, prompt: &str) -> Result<String, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_fresh() {
        assert_eq!(ConversationState::default(), ConversationState::Fresh);
        assert!(!ConversationState::Fresh.is_continuing());
        assert!(ConversationState::Continuing.is_continuing());
    }
}
