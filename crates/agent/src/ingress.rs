//! Audio ingress
//!
//! Reads caller frames until cancellation, disconnect, a read error or the
//! idle deadline. Audio goes to the bounded queue without ever blocking the
//! reader; text frames carry control messages.

use media_gateway_pipeline::{AudioQueue, OfferOutcome};
use media_gateway_transport::{parse_control, ControlMessage, FrameSource, InboundFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::turn::TurnSubmitter;

/// Why the reader stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngressExit {
    Cancelled,
    /// Peer closed the connection
    Disconnected,
    /// No frame within the read deadline
    IdleTimeout,
    ReadError(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngressStats {
    pub queued: u64,
    pub dropped: u64,
    pub transcripts: u64,
}

pub struct AudioIngress {
    call_id: String,
    queue: Arc<AudioQueue>,
    turns: TurnSubmitter,
    read_timeout: Duration,
    stats: IngressStats,
}

impl AudioIngress {
    pub fn new(
        call_id: impl Into<String>,
        queue: Arc<AudioQueue>,
        turns: TurnSubmitter,
        read_timeout: Duration,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            queue,
            turns,
            read_timeout,
            stats: IngressStats::default(),
        }
    }

    pub fn stats(&self) -> IngressStats {
        self.stats
    }

    /// Read until the session ends. The caller maps the exit to a cancellation.
    pub async fn run(&mut self, source: &mut dyn FrameSource, cancel: &CancellationToken) -> IngressExit {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return IngressExit::Cancelled,
                next = tokio::time::timeout(self.read_timeout, source.next_frame()) => next,
            };

            let frame = match next {
                Err(_) => {
                    tracing::info!(
                        call_id = %self.call_id,
                        timeout_secs = self.read_timeout.as_secs(),
                        "No caller frames within read deadline"
                    );
                    return IngressExit::IdleTimeout;
                }
                Ok(None) | Ok(Some(Ok(InboundFrame::Close))) => return IngressExit::Disconnected,
                Ok(Some(Err(e))) => return IngressExit::ReadError(e.to_string()),
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                InboundFrame::Audio(pcm) => self.on_audio(pcm),
                InboundFrame::Text(raw) => self.on_control(&raw),
                InboundFrame::Ping | InboundFrame::Pong | InboundFrame::Close => {}
            }
        }
    }

    fn on_audio(&mut self, pcm: bytes::Bytes) {
        match self.queue.offer(pcm) {
            OfferOutcome::Queued => self.stats.queued += 1,
            OfferOutcome::Dropped => {
                self.stats.dropped += 1;
                metrics::counter!("gateway_audio_chunks_dropped_total").increment(1);
                if self.stats.dropped.is_power_of_two() {
                    tracing::debug!(call_id = %self.call_id, dropped = self.stats.dropped, "Audio queue full, dropping chunks");
                }
            }
            // Recognition is gone; audio is discarded for the rest of the call
            OfferOutcome::Closed => {}
        }
    }

    fn on_control(&mut self, raw: &str) {
        match parse_control(raw) {
            Some(ControlMessage::Transcript { text }) => {
                tracing::info!(call_id = %self.call_id, transcript = %text, "Injected transcript");
                if self.turns.submit(text) {
                    self.stats.transcripts += 1;
                }
            }
            Some(ControlMessage::Heartbeat) => {
                tracing::trace!(call_id = %self.call_id, "Heartbeat");
            }
            None => {}
        }
    }
}
