//! Speech playback engine
//!
//! Streams synthesized PCM to the caller in fixed-size chunks paced at
//! roughly real time. Barge-in clears the speaking state; the engine checks
//! it under the transport write-lock before every chunk, so no chunk is
//! written after an interruption is observed.

use bytes::Bytes;
use media_gateway_config::PlaybackConfig;
use media_gateway_core::{SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech, TenantProfile};
use media_gateway_transport::{OutboundMessage, TransportWriter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use super::state::{SpeakingGuard, SpeakingState};
use super::text::optimize_for_speech;
use crate::PipelineError;

/// Everything playback needs from the call session
#[derive(Clone)]
pub struct PlaybackTarget {
    pub call_id: String,
    pub tenant: TenantProfile,
    pub writer: Arc<TransportWriter>,
    pub speaking: Arc<SpeakingState>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed { chunks: usize },
    /// Barge-in ended playback early
    Interrupted { chunks: usize },
    /// Another utterance was already playing
    Busy,
    /// Session cancelled mid-utterance
    Cancelled,
    /// Nothing left to say after normalization
    Empty,
}

pub struct PlaybackEngine {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    chunk_bytes: usize,
    pacing: Duration,
}

impl PlaybackEngine {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, config: &PlaybackConfig) -> Self {
        Self {
            synthesizer,
            chunk_bytes: config.chunk_bytes.max(2),
            pacing: config.pacing(),
        }
    }

    /// Speak `text` to the caller.
    ///
    /// Synthesis failures return `PipelineError::Tts` and affect only this
    /// utterance; transport failures return `PipelineError::Transport`.
    pub async fn speak(
        &self,
        target: &PlaybackTarget,
        text: &str,
    ) -> Result<PlaybackOutcome, PipelineError> {
        let spoken = optimize_for_speech(text);
        if spoken.is_empty() {
            return Ok(PlaybackOutcome::Empty);
        }

        let Some(guard) = target.speaking.try_begin() else {
            tracing::warn!(call_id = %target.call_id, "Playback already in progress, rejecting");
            return Ok(PlaybackOutcome::Busy);
        };

        let started = Instant::now();
        let request = SynthesisRequest::for_tenant(&target.tenant, spoken);
        let speech = tokio::select! {
            biased;
            _ = target.cancel.cancelled() => return Ok(PlaybackOutcome::Cancelled),
            _ = guard.interrupted() => return Ok(PlaybackOutcome::Interrupted { chunks: 0 }),
            speech = self.synthesizer.synthesize(&request) => {
                speech.map_err(|e| PipelineError::Tts(e.to_string()))?
            }
        };

        let outcome = match speech {
            SynthesizedSpeech::Pcm(reader) => self.stream_pcm(target, &guard, reader).await?,
            SynthesizedSpeech::ClientRendered { estimated } => {
                self.hold_for_client(target, &guard, &request.text, estimated)
                    .await?
            }
        };

        match outcome {
            PlaybackOutcome::Interrupted { chunks } => {
                metrics::counter!("gateway_playback_interrupted_total").increment(1);
                tracing::info!(call_id = %target.call_id, chunks, "Playback interrupted");
            }
            PlaybackOutcome::Completed { chunks } => {
                tracing::debug!(
                    call_id = %target.call_id,
                    chunks,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Playback completed"
                );
            }
            _ => {}
        }
        Ok(outcome)
    }

    async fn stream_pcm(
        &self,
        target: &PlaybackTarget,
        guard: &SpeakingGuard,
        mut reader: std::pin::Pin<Box<dyn AsyncRead + Send>>,
    ) -> Result<PlaybackOutcome, PipelineError> {
        let mut buf = vec![0u8; self.chunk_bytes];
        let mut chunks = 0;

        loop {
            if !guard.is_current() {
                return Ok(PlaybackOutcome::Interrupted { chunks });
            }

            let filled = tokio::select! {
                biased;
                _ = target.cancel.cancelled() => return Ok(PlaybackOutcome::Cancelled),
                _ = guard.interrupted() => return Ok(PlaybackOutcome::Interrupted { chunks }),
                read = fill_chunk(&mut reader, &mut buf) => {
                    read.map_err(|e| PipelineError::Tts(format!("synthesis stream failed: {}", e)))?
                }
            };
            if filled == 0 {
                return Ok(PlaybackOutcome::Completed { chunks });
            }

            let chunk = Bytes::copy_from_slice(&buf[..filled]);
            if !target
                .writer
                .send_audio_if(chunk, || guard.is_current())
                .await?
            {
                return Ok(PlaybackOutcome::Interrupted { chunks });
            }
            chunks += 1;

            if filled < self.chunk_bytes {
                return Ok(PlaybackOutcome::Completed { chunks });
            }

            tokio::select! {
                biased;
                _ = target.cancel.cancelled() => return Ok(PlaybackOutcome::Cancelled),
                _ = guard.interrupted() => return Ok(PlaybackOutcome::Interrupted { chunks }),
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }
    }

    async fn hold_for_client(
        &self,
        target: &PlaybackTarget,
        guard: &SpeakingGuard,
        text: &str,
        estimated: Duration,
    ) -> Result<PlaybackOutcome, PipelineError> {
        if !guard.is_current() {
            return Ok(PlaybackOutcome::Interrupted { chunks: 0 });
        }
        target
            .writer
            .send_message(&OutboundMessage::response(&target.tenant, text))
            .await?;

        tokio::select! {
            biased;
            _ = target.cancel.cancelled() => Ok(PlaybackOutcome::Cancelled),
            _ = guard.interrupted() => Ok(PlaybackOutcome::Interrupted { chunks: 0 }),
            _ = tokio::time::sleep(estimated) => Ok(PlaybackOutcome::Completed { chunks: 0 }),
        }
    }
}

/// Read until `buf` is full or the stream ends
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
