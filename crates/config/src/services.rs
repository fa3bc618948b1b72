//! Upstream service configuration
//!
//! Each service has a real and a simulated provider; the provider is chosen
//! once at startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionProvider {
    /// WebSocket streaming recognition service
    Streaming,
    /// Client injects transcripts as text frames
    #[default]
    Injected,
}

/// Speech recognition service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub provider: RecognitionProvider,

    /// WebSocket endpoint, e.g. `ws://localhost:8090/v1/stream`
    #[serde(default = "default_recognition_url")]
    pub url: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_recognition_url() -> String {
    "ws://localhost:8090/v1/stream".to_string()
}
fn default_language() -> String {
    "en-US".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            provider: RecognitionProvider::default(),
            url: default_recognition_url(),
            language: default_language(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl RecognitionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisProvider {
    /// HTTP synthesis service streaming raw PCM
    Http,
    /// Client renders speech from `response` frames
    #[default]
    Client,
}

/// Speech synthesis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub provider: SynthesisProvider,

    #[serde(default = "default_synthesis_url")]
    pub url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_synthesis_url() -> String {
    "http://localhost:8091".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: SynthesisProvider::default(),
            url: default_synthesis_url(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialogueProvider {
    /// Hosted conversational agent over HTTP
    Http,
    /// Built-in scripted appointment flow
    #[default]
    Scripted,
}

/// Conversational agent service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    #[serde(default)]
    pub provider: DialogueProvider,

    #[serde(default = "default_dialogue_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub agent_id: String,

    #[serde(default = "default_alias_id")]
    pub alias_id: String,

    /// Bearer token for the agent service
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_dialogue_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_dialogue_endpoint() -> String {
    "http://localhost:8092".to_string()
}
fn default_alias_id() -> String {
    "live".to_string()
}
fn default_dialogue_timeout_ms() -> u64 {
    15_000
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            provider: DialogueProvider::default(),
            endpoint: default_dialogue_endpoint(),
            agent_id: String::new(),
            alias_id: default_alias_id(),
            api_key: None,
            timeout_ms: default_dialogue_timeout_ms(),
        }
    }
}

impl DialogueConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tenant used when no directory tier resolves the number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTenantConfig {
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_display_name() -> String {
    "Medical Clinic".to_string()
}
fn default_voice_id() -> String {
    "Joanna".to_string()
}
fn default_engine() -> String {
    "neural".to_string()
}
fn default_greeting() -> String {
    "Hello! How can I help you today?".to_string()
}

impl Default for FallbackTenantConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            voice_id: default_voice_id(),
            engine: default_engine(),
            greeting: default_greeting(),
        }
    }
}

/// Tenant directory tiers, consulted in order: service, file, built-in table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    /// Tenant config service base URL
    #[serde(default)]
    pub service_url: Option<String>,

    /// Local YAML tenant directory
    #[serde(default)]
    pub directory_path: Option<String>,

    /// Serve the built-in demo numbers
    #[serde(default = "default_true")]
    pub builtin_directory: bool,

    #[serde(default)]
    pub fallback: FallbackTenantConfig,
}

fn default_true() -> bool {
    true
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            directory_path: None,
            builtin_directory: true,
            fallback: FallbackTenantConfig::default(),
        }
    }
}

/// Event socket connection to the telephony switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_esl_host")]
    pub host: String,

    #[serde(default = "default_esl_port")]
    pub port: u16,

    #[serde(default = "default_esl_password")]
    pub password: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_esl_host() -> String {
    "127.0.0.1".to_string()
}
fn default_esl_port() -> u16 {
    8021
}
fn default_esl_password() -> String {
    "ClueCon".to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_esl_host(),
            port: default_esl_port(),
            password: default_esl_password(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl TelephonyConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Per-call conversation transcripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLogConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_directory")]
    pub directory: String,
}

fn default_log_directory() -> String {
    "data/conversations".to_string()
}

impl Default for ConversationLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_log_directory(),
        }
    }
}
