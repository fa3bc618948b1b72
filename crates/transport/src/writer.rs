//! Serialized outbound writer
//!
//! Every task that writes to the caller goes through one `TransportWriter`,
//! so at most one frame is in flight at a time.

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::frame::OutboundMessage;
use crate::traits::FrameSink;
use crate::TransportError;

pub struct TransportWriter {
    sink: Mutex<Box<dyn FrameSink>>,
    closed: AtomicBool,
}

impl TransportWriter {
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a JSON text message
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let json = message.to_json()?;
        let mut sink = self.sink.lock().await;
        self.ensure_open()?;
        sink.send_text(json).await
    }

    /// Send one audio chunk
    pub async fn send_audio(&self, chunk: Bytes) -> Result<(), TransportError> {
        self.send_audio_if(chunk, || true).await.map(|_| ())
    }

    /// Send one audio chunk if `still_wanted` holds once the lock is held.
    ///
    /// Returns `Ok(false)` without writing when the check fails.
    pub async fn send_audio_if<F>(&self, chunk: Bytes, still_wanted: F) -> Result<bool, TransportError>
    where
        F: FnOnce() -> bool,
    {
        let mut sink = self.sink.lock().await;
        self.ensure_open()?;
        if !still_wanted() {
            return Ok(false);
        }
        sink.send_binary(chunk).await?;
        Ok(true)
    }

    /// Close the connection. Only the first call reaches the sink.
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        sink.close().await
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}
