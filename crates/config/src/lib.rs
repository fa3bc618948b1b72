//! Configuration management for the call media gateway
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (`MEDIA_GATEWAY__` prefix, `__` separator)

pub mod services;
pub mod session;
pub mod settings;

pub use services::{
    ConversationLogConfig, DialogueConfig, DialogueProvider, FallbackTenantConfig,
    RecognitionConfig, RecognitionProvider, SynthesisConfig, SynthesisProvider,
    TelephonyConfig, TenantsConfig,
};
pub use session::{PlaybackConfig, SessionConfig};
pub use settings::{
    load_settings, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
    ENV_PREFIX, ENV_SELECTOR,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
