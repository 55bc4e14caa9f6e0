pub mod conversation_detail;
pub mod conversation_index;
pub mod display_names;

pub use conversation_detail::{validate_message, ConversationDetail, SendState};
pub use conversation_index::{ConversationIndex, IndexedConversation, RefreshOutcome};
pub use display_names::{display_title, DisplayNameCache, DisplayOverride};
