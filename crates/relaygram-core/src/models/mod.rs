pub mod address;
pub mod conversation;
pub mod message;

pub use conversation::{ns_to_ms, Conversation, ConversationKind, GroupMetadata};
pub use message::{sort_by_sent_at, FilePayload, Message, MessageContent};
