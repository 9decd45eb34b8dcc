//! Ordered conversation history.

use crate::{ChatMessage, Role};

/// The messages sent with every chat turn, in prompt order.
///
/// At most one system message exists and it always sits at index 0. The
/// list is only mutated through [`set_system_prompt`](Self::set_system_prompt)
/// and [`push`](Self::push); it is never reordered or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that starts with the given system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.set_system_prompt(prompt);
        history
    }

    /// Replace the system prompt at index 0, or insert one there.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let message = ChatMessage::system(prompt);
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => *first = message,
            _ => self.messages.insert(0, message),
        }
    }

    /// The current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Append a message.
    ///
    /// System messages are routed through [`set_system_prompt`](Self::set_system_prompt)
    /// so the single-system-message invariant holds.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.set_system_prompt(message.content);
            return;
        }
        self.messages.push(message);
    }

    /// Drop every message except the system prompt.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    /// The messages in prompt order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Number of messages, system prompt included.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages at all.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
