//! Speech synthesis and playback side of the pipeline

mod client_side;
mod http;
mod playback;
mod state;
mod text;

pub use client_side::ClientSideSynthesizer;
pub use http::HttpSynthesizer;
pub use playback::{PlaybackEngine, PlaybackOutcome, PlaybackTarget};
pub use state::{Speaking, SpeakingGuard, SpeakingState};
pub use text::optimize_for_speech;

use media_gateway_config::{PlaybackConfig, SynthesisConfig, SynthesisProvider};
use media_gateway_core::SpeechSynthesizer;
use std::sync::Arc;

use crate::PipelineError;

/// Build the configured synthesizer
pub fn create_synthesizer(
    config: &SynthesisConfig,
    playback: &PlaybackConfig,
) -> Result<Arc<dyn SpeechSynthesizer>, PipelineError> {
    match config.provider {
        SynthesisProvider::Http => {
            tracing::info!(url = %config.url, "Using HTTP speech synthesis");
            Ok(Arc::new(HttpSynthesizer::from_config(config)?))
        }
        SynthesisProvider::Client => {
            tracing::info!("Using client-rendered speech");
            Ok(Arc::new(ClientSideSynthesizer::from_config(playback)))
        }
    }
}
