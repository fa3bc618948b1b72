//! Call audio pipeline
//!
//! Inbound: bounded audio queue → silence filter → streaming recognition →
//! speech-start and final-transcript callbacks.
//!
//! Outbound: text normalization → synthesis → paced, interruptible chunked
//! playback over the serialized transport writer.

pub mod stt;
pub mod tts;

pub use stt::{
    audio_queue, create_recognizer, AudioQueue, InjectedRecognizer, OfferOutcome, RecognitionEnd,
    SimulatedRecognizer, SimulatedStream, StreamingRecognizer, TranscriptListener,
    TranscriptionBridge, UtteranceTracker,
};
pub use tts::{
    create_synthesizer, optimize_for_speech, ClientSideSynthesizer, HttpSynthesizer,
    PlaybackEngine, PlaybackOutcome, PlaybackTarget, Speaking, SpeakingGuard, SpeakingState,
};

use std::time::Duration;
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Transport error: {0}")]
    Transport(#[from] media_gateway_transport::TransportError),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl PipelineError {
    /// Whether the caller connection failed, as opposed to an upstream service
    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Transport(_))
    }
}

impl From<PipelineError> for media_gateway_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Stt(msg) => media_gateway_core::Error::Recognition(msg),
            PipelineError::Tts(msg) => media_gateway_core::Error::Synthesis(msg),
            PipelineError::Transport(e) => e.into(),
            PipelineError::ChannelClosed => media_gateway_core::Error::ChannelClosed,
            PipelineError::Timeout(after) => media_gateway_core::Error::Timeout(after),
        }
    }
}
