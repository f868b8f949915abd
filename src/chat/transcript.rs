use crate::chat::message::{Message, MessageRole};
use crate::types::WireMessage;
use crate::utils::time::not_before;

/// An append-only, ordered sequence of messages.
///
/// Messages are never removed or reordered.  Timestamps are clamped on append
/// so they never decrease along the sequence, even if the wall clock steps
/// backwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message at the tail and returns the stored copy.
    pub fn push(&mut self, mut message: Message) -> &Message {
        let floor = self.messages.last().map(|last| last.timestamp);
        message.timestamp = not_before(message.timestamp, floor);
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates over the messages, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if no message was ever appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Counts the non-error messages with `role`.
    pub fn count(&self, role: MessageRole) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == role && !m.is_error)
            .count()
    }

    /// Counts error-state messages.
    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_error).count()
    }

    /// The history as sent to the agent.  Error-state messages are left out.
    pub fn to_wire(&self) -> Vec<WireMessage> {
        self.messages
            .iter()
            .filter(|m| !m.is_error)
            .flat_map(Message::to_wire)
            .collect()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
