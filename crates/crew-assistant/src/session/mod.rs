//! Session state management
//!
//! Provides in-memory conversation state with:
//! - Bounded LRU cache of sessions (parking_lot mutex)
//! - Lazy expiry sweep on lookup
//! - Per-session history cap
//! - Usage metrics recomputed from the live cache

mod store;
pub mod types;

pub use store::{SessionStore, SessionStoreConfig};
pub use types::{Message, Role, SessionHandle, SessionId, SessionRecord};
