//! Error taxonomy for the client core.
//!
//! Four families mirror how failures are handled:
//! - [`SessionError`]: identity and session lifecycle (wallet missing, signer unavailable)
//! - [`NetworkError`]: anything the messaging network reported
//! - [`ValidationError`]: rejected locally, before any network call
//! - [`ResourceError`]: attachment size/type and upload failures

use crate::constants::{
    MAX_GROUP_DESCRIPTION_LENGTH, MAX_GROUP_MEMBERS, MAX_GROUP_NAME_LENGTH, MIN_GROUP_MEMBERS,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Please connect your wallet first")]
    WalletNotConnected,

    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Failed to initialize messaging session: {0}")]
    Init(String),

    #[error("No messaging session is open")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Sync failed: {0}")]
    Sync(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Message stream failed: {0}")]
    Subscription(String),

    #[error("Membership update failed: {0}")]
    Membership(String),

    #[error("Identity lookup failed: {0}")]
    Lookup(String),

    #[error("Failed to create conversation: {0}")]
    Create(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Messaging session is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No conversation selected")]
    NoConversation,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message is too long ({length}/{max} characters)")]
    MessageTooLong { length: usize, max: usize },

    #[error("Please enter an address")]
    MissingAddress,

    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("Address already added: {0}")]
    DuplicateMember(String),

    #[error("Group must have at least {} members (got {count})", MIN_GROUP_MEMBERS)]
    TooFewMembers { count: usize },

    #[error("Group cannot have more than {} members (got {count})", MAX_GROUP_MEMBERS)]
    TooManyMembers { count: usize },

    #[error("Group name cannot be empty")]
    EmptyName,

    #[error("Group name is too long (max {} characters)", MAX_GROUP_NAME_LENGTH)]
    NameTooLong,

    #[error("Group description is too long (max {} characters)", MAX_GROUP_DESCRIPTION_LENGTH)]
    DescriptionTooLong,

    #[error("This address is not registered on the network: {0}")]
    NotReachable(String),

    #[error("Conversation is not a group: {0}")]
    NotAGroup(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("File is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("File type not supported: {0}")]
    UnsupportedType(String),

    #[error("Failed to upload file: {0}")]
    Upload(String),

    #[error("Failed to read file: {0}")]
    Read(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// True when the failure was caught locally and nothing reached the network.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
