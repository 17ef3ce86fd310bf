use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AssistantError, Result};

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub sessions: SessionsConfig,
    pub metrics: MetricsConfig,
    pub context: ContextConfig,
    pub llm: LlmConfig,
    pub topics: TopicsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionsConfig {
    pub capacity: usize,
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_messages: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            timeout_secs: 3600,
            sweep_interval_secs: 300,
            max_messages: 50,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub response_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            response_window: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            timeout_seconds: 30,
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TopicsConfig {
    /// TOML topic table; the built-in table is used when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,crew_assistant=debug".to_string(),
            format: "pretty".to_string(),
            directory: "logs".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.llm.api_key.is_none() {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sessions.capacity == 0 {
            return Err(AssistantError::Config("sessions.capacity must be positive".to_string()));
        }
        if self.sessions.max_messages == 0 {
            return Err(AssistantError::Config(
                "sessions.max_messages must be positive".to_string(),
            ));
        }
        if self.metrics.response_window == 0 {
            return Err(AssistantError::Config(
                "metrics.response_window must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
