use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::session::Message;
use crate::topics::TopicTable;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 2000;

/// Maximum number of entries kept in `topic_flow`.
const TOPIC_FLOW_LIMIT: usize = 5;

const TIME_WORDS: [&str; 6] = ["mañana", "tarde", "noche", "día", "mes", "semana"];

const LOCATION_WORDS: [&str; 3] = ["base", "ciudad", "aeropuerto"];

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:base|ciudad|aeropuerto)\s+(?:de\s+)?([a-zA-Z\s]+)")
        .expect("location pattern is valid")
});

/// Free-text location following "base", "ciudad" or "aeropuerto".
pub fn extract_location(text: &str) -> Option<String> {
    LOCATION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PreferenceKey {
    #[serde(rename = "tiempo_preferido")]
    PreferredTime,
    #[serde(rename = "ubicacion")]
    Location,
}

impl PreferenceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKey::PreferredTime => "tiempo_preferido",
            PreferenceKey::Location => "ubicacion",
        }
    }
}

/// Preferences in the order they were first detected. Overwriting a key
/// keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Preferences(IndexMap<PreferenceKey, String>);

impl Preferences {
    pub fn set(&mut self, key: PreferenceKey, value: impl Into<String>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: PreferenceKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn preferred_time(&self) -> Option<&str> {
        self.get(PreferenceKey::PreferredTime)
    }

    pub fn location(&self) -> Option<&str> {
        self.get(PreferenceKey::Location)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `key: value` pairs for the prompt, in detection order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Bounded summary of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationDigest {
    /// Formatted messages, oldest first, one per line.
    pub text: String,
    /// Newest mention first.
    pub topics_mentioned: Vec<String>,
    pub preferences: Preferences,
    /// Topic transitions, newest first. At most five entries.
    pub topic_flow: Vec<String>,
}

/// Builds a [`ConversationDigest`] from message history.
///
/// The walk goes newest to oldest. Two consequences are kept as-is:
/// `topic_flow` comes back newest first, and for `preferences` the oldest
/// matching user message wins because it is visited last.
#[derive(Clone)]
pub struct ContextExtractor {
    topics: Arc<TopicTable>,
    max_context_chars: usize,
}

impl ContextExtractor {
    pub fn new(topics: Arc<TopicTable>, max_context_chars: usize) -> Self {
        Self {
            topics,
            max_context_chars,
        }
    }

    pub fn extract(&self, messages: &[Message]) -> ConversationDigest {
        self.extract_with_limit(messages, self.max_context_chars)
    }

    pub fn extract_with_limit(&self, messages: &[Message], max_context_chars: usize) -> ConversationDigest {
        let mut lines: Vec<String> = Vec::new();
        let mut collected_chars = 0usize;
        let mut digest = ConversationDigest::default();

        for msg in messages.iter().rev() {
            let prefix = if msg.is_user { "User:" } else { "Assistant:" };
            let line = format!("{} {}", prefix, msg.text);
            collected_chars += line.chars().count();
            lines.push(line);

            let text = msg.text.to_lowercase();

            for topic in self.topics.mentioned(&text) {
                if !digest.topics_mentioned.iter().any(|t| t == &topic.id) {
                    digest.topics_mentioned.push(topic.id.clone());
                }
            }

            if msg.is_user {
                for word in TIME_WORDS {
                    if text.contains(word) {
                        digest.preferences.set(PreferenceKey::PreferredTime, word);
                    }
                }

                if LOCATION_WORDS.iter().any(|w| text.contains(w)) {
                    if let Some(location) = extract_location(&text) {
                        digest.preferences.set(PreferenceKey::Location, location);
                    }
                }
            }

            if digest.topic_flow.len() < TOPIC_FLOW_LIMIT {
                if let Some(topic) = self.topics.first_match(&text) {
                    if digest.topic_flow.last() != Some(&topic.id) {
                        digest.topic_flow.push(topic.id.clone());
                    }
                }
            }

            if collected_chars > max_context_chars {
                break;
            }
        }

        lines.reverse();
        digest.text = lines.join("\n");
        digest
    }
}
