//! Speech recognition and synthesis traits

use crate::tenant::{SynthesisEngine, TenantProfile};
use crate::transcript::RecognitionResult;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Upstream half of a recognition stream
#[async_trait]
pub trait RecognitionSink: Send {
    /// Forward one chunk of caller audio
    async fn send_audio(&mut self, pcm: Bytes) -> Result<()>;

    /// Signal end of audio; the event stream ends once the service flushes
    async fn finish(&mut self) -> Result<()>;
}

/// Downstream half of a recognition stream
pub type RecognitionEvents = Pin<Box<dyn Stream<Item = Result<RecognitionResult>> + Send>>;

/// A bidirectional recognition stream for one call
pub struct RecognitionStream {
    pub sink: Box<dyn RecognitionSink>,
    pub events: RecognitionEvents,
}

impl fmt::Debug for RecognitionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionStream").finish_non_exhaustive()
    }
}

/// How caller transcripts reach the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Audio is recognized by a streaming service
    Streaming,
    /// Transcripts are injected by the client as text frames
    Injected,
}

/// Streaming speech-to-text interface
///
/// Implementations:
/// - `StreamingRecognizer` - WebSocket recognition service
/// - `InjectedRecognizer` - no-op stream, transcripts arrive as control frames
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + 'static {
    /// Open one recognition stream for a call
    async fn open_stream(&self, call_id: &str) -> Result<RecognitionStream>;

    fn mode(&self) -> RecognitionMode;

    /// Release any upstream state for the call
    async fn end_session(&self, _call_id: &str) -> Result<()> {
        Ok(())
    }

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Synthesis request for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub engine: SynthesisEngine,
    pub sample_rate: u32,
}

impl SynthesisRequest {
    pub fn for_tenant(tenant: &TenantProfile, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: tenant.voice_id.clone(),
            engine: tenant.engine,
            sample_rate: crate::audio::SAMPLE_RATE_HZ,
        }
    }
}

/// Output of a synthesis request
pub enum SynthesizedSpeech {
    /// Raw 8 kHz PCM to be streamed to the caller
    Pcm(Pin<Box<dyn AsyncRead + Send>>),
    /// The client renders the audio itself; playback lasts about `estimated`
    ClientRendered { estimated: Duration },
}

impl fmt::Debug for SynthesizedSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesizedSpeech::Pcm(_) => f.write_str("Pcm(..)"),
            SynthesizedSpeech::ClientRendered { estimated } => f
                .debug_struct("ClientRendered")
                .field("estimated", estimated)
                .finish(),
        }
    }
}

/// Text-to-speech interface
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedSpeech>;

    fn name(&self) -> &str;
}
