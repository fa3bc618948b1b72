//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, ConversationLogConfig, DialogueConfig, DialogueProvider, PlaybackConfig,
    RecognitionConfig, RecognitionProvider, SessionConfig, SynthesisConfig, SynthesisProvider,
    TelephonyConfig, TenantsConfig,
};

/// Prefix for environment overrides, e.g. `MEDIA_GATEWAY__SERVER__PORT`
pub const ENV_PREFIX: &str = "MEDIA_GATEWAY";

/// Variable naming the environment-specific config file
pub const ENV_SELECTOR: &str = "MEDIA_GATEWAY_ENV";

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Simulated services allowed
    #[default]
    Development,
    Staging,
    /// Real services required
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub dialogue: DialogueConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,

    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub conversation_log: ConversationLogConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_session()?;
        self.validate_playback()?;
        self.validate_services()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port must be non-zero"));
        }
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        if session.audio_queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "session.audio_queue_capacity",
                "Audio queue must hold at least one chunk",
            ));
        }

        if session.read_timeout_secs == 0 || session.injected_read_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "session.read_timeout_secs",
                "Read timeouts must be non-zero",
            ));
        }

        if session.tenant_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "session.tenant_timeout_ms",
                "Tenant timeout must be non-zero",
            ));
        }

        Ok(())
    }

    fn validate_playback(&self) -> Result<(), ConfigError> {
        let chunk = self.playback.chunk_bytes;
        if chunk == 0 || chunk % 2 != 0 {
            return Err(ConfigError::invalid(
                "playback.chunk_bytes",
                format!("Must be a positive whole number of 16-bit samples, got {}", chunk),
            ));
        }
        Ok(())
    }

    fn validate_services(&self) -> Result<(), ConfigError> {
        if self.recognition.provider == RecognitionProvider::Streaming
            && !(self.recognition.url.starts_with("ws://")
                || self.recognition.url.starts_with("wss://"))
        {
            return Err(ConfigError::invalid(
                "recognition.url",
                format!("Streaming recognition needs a ws:// or wss:// URL, got {}", self.recognition.url),
            ));
        }

        if self.synthesis.provider == SynthesisProvider::Http && self.synthesis.url.is_empty() {
            return Err(ConfigError::MissingField("synthesis.url".to_string()));
        }

        if self.dialogue.provider == DialogueProvider::Http && self.dialogue.agent_id.is_empty() {
            return Err(ConfigError::MissingField("dialogue.agent_id".to_string()));
        }

        if self.telephony.enabled && self.telephony.host.is_empty() {
            return Err(ConfigError::MissingField("telephony.host".to_string()));
        }

        if self.environment.is_production() && self.dialogue.provider == DialogueProvider::Scripted
        {
            return Err(ConfigError::invalid(
                "dialogue.provider",
                "Scripted dialogue is not allowed in production",
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env}.* > config/default.* > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
