//! Error types shared across the gateway

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("Tenant resolution error: {0}")]
    Tenant(String),

    #[error("Telephony control error: {0}")]
    Telephony(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means the caller's transport is gone.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::ChannelClosed)
    }
}
