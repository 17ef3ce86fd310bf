//! Conversation context
//!
//! - `extractor`: history -> bounded digest with topic and preference signals
//! - `prompt`: digest + topic context -> system message for the completion call

mod extractor;
mod prompt;

pub use extractor::{
    extract_location, ContextExtractor, ConversationDigest, PreferenceKey, Preferences, DEFAULT_MAX_CONTEXT_CHARS,
};
pub use prompt::PromptBuilder;
