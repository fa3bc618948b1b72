//! Speech recognition side of the pipeline

mod bridge;
mod injected;
mod queue;
mod simulated;
mod streaming;

pub use bridge::{RecognitionEnd, TranscriptListener, TranscriptionBridge, UtteranceTracker};
pub use injected::InjectedRecognizer;
pub use queue::{audio_queue, AudioQueue, OfferOutcome};
pub use simulated::{SimulatedRecognizer, SimulatedStream};
pub use streaming::StreamingRecognizer;

use media_gateway_config::{RecognitionConfig, RecognitionProvider};
use media_gateway_core::SpeechRecognizer;
use std::sync::Arc;

/// Build the configured recognizer
pub fn create_recognizer(config: &RecognitionConfig) -> Arc<dyn SpeechRecognizer> {
    match config.provider {
        RecognitionProvider::Streaming => {
            tracing::info!(url = %config.url, language = %config.language, "Using streaming recognition");
            Arc::new(StreamingRecognizer::from_config(config))
        }
        RecognitionProvider::Injected => {
            tracing::info!("Using client-injected transcripts");
            Arc::new(InjectedRecognizer)
        }
    }
}
