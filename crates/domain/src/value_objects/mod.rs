//! Value objects

pub mod conversation_id;
pub mod user_name;

pub use conversation_id::ConversationId;
pub use user_name::UserName;
