use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub type SessionId = String;

/// Shared handle to one session. Every caller that looks up the same id gets
/// a clone of the same `Arc`.
pub type SessionHandle = Arc<Mutex<SessionRecord>>;

pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Crew role declared by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "tripulante")]
    Crew,
    #[serde(rename = "piloto")]
    Pilot,
    #[serde(rename = "capitan")]
    Captain,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Crew => "tripulante",
            Role::Pilot => "piloto",
            Role::Captain => "capitan",
        }
    }

    /// Label with the first letter upper-cased, used in templates.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Crew => "Tripulante",
            Role::Pilot => "Piloto",
            Role::Captain => "Capitan",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, is_user: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            is_user,
            timestamp,
        }
    }
}

/// Conversation state kept per session id.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub role: Option<Role>,
    /// Chronological; never longer than the store's `max_messages`.
    pub messages: Vec<Message>,
    pub last_topic: Option<String>,
    /// Operating base captured from the user's messages.
    pub base: Option<String>,
    last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(id: impl Into<SessionId>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: None,
            messages: Vec::new(),
            last_topic: None,
            base: None,
            last_activity: now,
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Refresh the activity timestamp. Never moves it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Append a message, dropping the oldest ones while over `max_messages`.
    pub fn push_message(&mut self, message: Message, max_messages: usize) {
        self.messages.push(message);
        if self.messages.len() > max_messages {
            let overflow = self.messages.len() - max_messages;
            self.messages.drain(..overflow);
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
