pub mod attachments;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod membership;
pub mod models;
pub mod runtime;
pub mod session;
pub mod store;
pub mod streaming;
pub mod tracing_setup;

pub use config::{CoreConfig, NetworkEnv};
pub use error::{CoreError, CoreResult, NetworkError, ResourceError, SessionError, ValidationError};
pub use events::{CoreEvent, EventBus};
pub use runtime::CoreRuntime;
