//! Call audio transport and telephony control
//!
//! Features:
//! - Frame protocol for the caller's duplex audio connection
//! - Serialized outbound writer shared by every session task
//! - In-memory loopback transport
//! - FreeSWITCH event socket client for out-of-band call control

pub mod esl;
pub mod frame;
pub mod loopback;
pub mod traits;
pub mod writer;

pub use esl::{DisabledTelephony, EslClient};
pub use frame::{parse_control, ControlMessage, InboundFrame, OutboundMessage};
pub use loopback::{loopback, LoopbackPeer, LoopbackSink, LoopbackSource, OutboundFrame, WriteMonitor};
pub use traits::{FrameSink, FrameSource};
pub use writer::TransportWriter;

use std::time::Duration;
use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TransportError> for media_gateway_core::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => media_gateway_core::Error::ChannelClosed,
            TransportError::Timeout(after) => media_gateway_core::Error::Timeout(after),
            other => media_gateway_core::Error::Transport(other.to_string()),
        }
    }
}
