//! Insertion-ordered conversation buffer.
//!
//! A streamed assistant reply is appended as one empty message whose content
//! grows chunk by chunk; no new message is created per chunk. Chunks address
//! messages by stable id, so a late chunk from a superseded stream still
//! lands on its own (stale) message and never on a newer one.

use super::message::{ChatMessage, MessageRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a message within a conversation.
pub type MessageId = Uuid;

/// Ordered chat history for one student session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message and returns its id.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        self.push(ChatMessage::new(MessageRole::User, content))
    }

    /// Appends a system message and returns its id.
    pub fn push_system(&mut self, content: impl Into<String>) -> MessageId {
        self.push(ChatMessage::new(MessageRole::System, content))
    }

    /// Appends an empty assistant message for a reply about to stream in.
    pub fn begin_assistant(&mut self) -> MessageId {
        self.push(ChatMessage::new(MessageRole::Assistant, ""))
    }

    /// Appends `chunk` to the message with the given id.
    ///
    /// Returns `false` when no such message exists.
    pub fn append_chunk(&mut self, id: MessageId, chunk: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content.push_str(chunk);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: ChatMessage) -> MessageId {
        let id = message.id;
        self.messages.push(message);
        id
    }
}
