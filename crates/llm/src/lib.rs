//! Conversational agent backends
//!
//! - `HttpDialogueBackend`: hosted agent reached over HTTP, one agent session per call
//! - `ScriptedDialogue`: built-in appointment flow for running without an agent
//!
//! Both report handoff requests the same way: either the service sets
//! `requires_handoff`, or the completion contains a transfer phrase.

pub mod backend;
pub mod factory;
pub mod scripted;
pub mod signals;

pub use backend::HttpDialogueBackend;
pub use factory::create_dialogue;
pub use scripted::ScriptedDialogue;
pub use signals::{detect_handoff, interpret_reply, HANDOFF_PHRASES};

use std::time::Duration;
use thiserror::Error;

/// Dialogue backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<LlmError> for media_gateway_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(after) => media_gateway_core::Error::Timeout(after),
            other => media_gateway_core::Error::Dialogue(other.to_string()),
        }
    }
}
