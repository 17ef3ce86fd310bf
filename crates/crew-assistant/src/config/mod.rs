pub mod settings;

pub use settings::{
    ContextConfig, LlmConfig, LoggingConfig, MetricsConfig, SessionsConfig, Settings, TopicsConfig,
};
