use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::{AssistantError, Result};
use crate::session::Role;

use super::matcher::normalize_text;

const BUILTIN_TOPICS: &str = include_str!("../../config/topics.toml");

/// Replacement for the role line when the user has not declared a role.
const ALL_ROLES_TEXT: &str = "todos los roles";

/// One value per crew role.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PerRole<T> {
    #[serde(rename = "tripulante")]
    pub crew: T,
    #[serde(rename = "piloto")]
    pub pilot: T,
    #[serde(rename = "capitan")]
    pub captain: T,
}

impl<T> PerRole<T> {
    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Crew => &self.crew,
            Role::Pilot => &self.pilot,
            Role::Captain => &self.captain,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BaseDaily {
    pub base: String,
    pub daily: String,
}

/// Role-specific data attached to a topic template.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RoleInfo {
    #[default]
    None,
    /// Fills `{role}` and `{role_info}`.
    Flat(PerRole<String>),
    /// Fills `{base_amount}` and `{daily_amount}`.
    BaseDaily(PerRole<BaseDaily>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub id: String,
    pub keywords: Vec<String>,
    pub template: String,
    #[serde(default)]
    pub role_info: RoleInfo,
    /// Keywords with accents stripped, filled in at load time.
    #[serde(skip)]
    pub(crate) normalized_keywords: Vec<String>,
}

impl Topic {
    /// Template text specialized for `role`.
    pub fn render_context(&self, role: Option<Role>) -> String {
        match (&self.role_info, role) {
            (RoleInfo::None, _) => self.template.clone(),
            (RoleInfo::Flat(info), Some(role)) => self
                .template
                .replace("{role}", role.title())
                .replace("{role_info}", info.get(role)),
            (RoleInfo::Flat(_), None) => self.template.replace("{role}s: {role_info}", ALL_ROLES_TEXT),
            (RoleInfo::BaseDaily(amounts), role) => {
                let amounts = amounts.get(role.unwrap_or(Role::Crew));
                self.template
                    .replace("{base_amount}", &amounts.base)
                    .replace("{daily_amount}", &amounts.daily)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TopicFile {
    topics: Vec<Topic>,
}

/// Ordered, read-only collection of topics.
#[derive(Debug, Clone)]
pub struct TopicTable {
    topics: Vec<Topic>,
}

impl TopicTable {
    pub fn new(mut topics: Vec<Topic>) -> Result<Self> {
        let mut seen = HashSet::new();
        for topic in &mut topics {
            if topic.id.trim().is_empty() {
                return Err(AssistantError::TopicTable("topic with empty id".to_string()));
            }
            if !seen.insert(topic.id.clone()) {
                return Err(AssistantError::TopicTable(format!(
                    "duplicate topic id '{}'",
                    topic.id
                )));
            }
            // matching runs on lower-cased input, so upper-case keywords could never hit
            if let Some(keyword) = topic.keywords.iter().find(|k| k.to_lowercase() != **k) {
                return Err(AssistantError::TopicTable(format!(
                    "keyword '{}' in topic '{}' must be lower-case",
                    keyword, topic.id
                )));
            }
            topic.normalized_keywords = topic.keywords.iter().map(|k| normalize_text(k)).collect();
        }
        Ok(Self { topics })
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: TopicFile = toml::from_str(source)?;
        Self::new(file.topics)
    }

    /// The crew benefits table bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TOPICS)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let table = Self::from_toml_str(&source)?;
        info!("Loaded {} topics from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
