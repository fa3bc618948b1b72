//! Wire frames exchanged with the caller's audio connection
//!
//! Inbound binary frames carry 16-bit LE PCM at 8 kHz. Inbound text frames
//! carry JSON control messages. Outbound text frames announce speech the
//! client should render; outbound binary frames carry synthesized PCM.

use bytes::Bytes;
use media_gateway_core::TenantProfile;
use serde::{Deserialize, Serialize};

/// A frame read from the caller connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Audio(Bytes),
    Text(String),
    Ping,
    Pong,
    /// Peer sent a close frame
    Close,
}

/// Inbound control message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Client-supplied final transcript
    Transcript {
        #[serde(default)]
        text: String,
    },
    /// Keeps an idle connection alive
    Heartbeat,
}

/// Parse a text frame. Malformed or unknown messages yield `None`.
pub fn parse_control(raw: &str) -> Option<ControlMessage> {
    match serde_json::from_str::<ControlMessage>(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unrecognized control frame");
            None
        }
    }
}

/// Outbound text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Greeting {
        text: String,
        voice: String,
        engine: String,
    },
    Response {
        text: String,
        voice: String,
        engine: String,
    },
}

impl OutboundMessage {
    pub fn greeting(tenant: &TenantProfile) -> Self {
        OutboundMessage::Greeting {
            text: tenant.greeting.clone(),
            voice: tenant.voice_id.clone(),
            engine: tenant.engine.to_string(),
        }
    }

    pub fn response(tenant: &TenantProfile, text: impl Into<String>) -> Self {
        OutboundMessage::Response {
            text: text.into(),
            voice: tenant.voice_id.clone(),
            engine: tenant.engine.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
