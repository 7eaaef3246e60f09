//! Chat conversation domain module.

mod conversation;
mod message;

pub use conversation::{Conversation, MessageId};
pub use message::{ChatMessage, MessageRole};
