//! Domain entities

pub mod chat_message;
pub mod conversation;

pub use chat_message::{ChatMessage, MessageRole};
pub use conversation::{Conversation, DEFAULT_MAX_TURN_PAIRS};
