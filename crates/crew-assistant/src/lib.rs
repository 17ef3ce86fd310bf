pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod services;
pub mod session;
pub mod topics;

pub use config::Settings;
pub use engine::{CompletionProvider, ConversationEngine};
pub use error::AssistantError;
pub use session::{SessionStore, SessionStoreConfig};
