//! Transport traits

use async_trait::async_trait;
use bytes::Bytes;

use crate::frame::InboundFrame;
use crate::TransportError;

/// Outbound half of a caller connection
///
/// Not safe for concurrent use; wrap in [`crate::TransportWriter`].
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of a caller connection
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Next frame, or `None` once the peer is gone
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>>;
}
