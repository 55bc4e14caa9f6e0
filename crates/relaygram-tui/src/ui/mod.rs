pub mod app;
pub mod components;
pub mod format;
pub mod modal;
pub mod notifications;
pub mod terminal;
pub mod text_input;
pub mod theme;
pub mod views;

pub use app::{App, ChatSnapshot, ConversationRow, Focus, View};
pub use modal::ModalState;
pub use terminal::{init as init_terminal, restore as restore_terminal, Tui};
