//! Application-wide constants
//!
//! Centralized location for limits, labels and timing values that are
//! shared between the core and the terminal front end.

/// Reported to the messaging network when a session is created
pub const APP_VERSION: &str = "relaygram/0.1.0";

/// Directory name under the platform data dir
pub const APP_DIR_NAME: &str = "relaygram";

// Message limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
/// Composer shows a character counter once input passes this length (80% of the max)
pub const MESSAGE_COUNTER_THRESHOLD: usize = MAX_MESSAGE_LENGTH * 4 / 5;
/// Conversation list preview length
pub const MAX_PREVIEW_CHARS: usize = 50;

// Group limits
pub const MIN_GROUP_MEMBERS: usize = 2;
pub const MAX_GROUP_MEMBERS: usize = 250;
pub const MAX_GROUP_NAME_LENGTH: usize = 50;
pub const MAX_GROUP_DESCRIPTION_LENGTH: usize = 200;

// Display defaults
pub const DEFAULT_GROUP_NAME: &str = "New Group";
pub const GROUP_FALLBACK_TITLE: &str = "Group Chat";

// Attachment limits
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;
pub const ALLOWED_FILE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
];

// Timing
/// Background conversation refresh interval
pub const POLL_INTERVAL_SECS: u64 = 15;
/// Wait after a successful send before re-fetching, so the network can propagate it
pub const SEND_SETTLE_DELAY_MS: u64 = 500;

// Local storage
pub const DISPLAY_NAMES_FILE: &str = "display_names.json";
pub const LOG_FILE: &str = "relaygram.log";

// Environment variables
pub mod env_vars {
    pub const DATA_DIR: &str = "RELAYGRAM_DATA_DIR";
    pub const NETWORK_ENV: &str = "RELAYGRAM_ENV";
    pub const POLL_SECS: &str = "RELAYGRAM_POLL_SECS";
    pub const LOG_FILTER: &str = "RELAYGRAM_LOG";
}
