//! Client-rendered speech
//!
//! The gateway sends the text in a `response` frame and the client speaks it.
//! Playback only tracks how long the client is expected to be talking.

use async_trait::async_trait;
use media_gateway_config::PlaybackConfig;
use media_gateway_core::{Result, SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientSideSynthesizer {
    ms_per_word: u64,
    min_ms: u64,
}

impl ClientSideSynthesizer {
    pub fn new(ms_per_word: u64, min_ms: u64) -> Self {
        Self { ms_per_word, min_ms }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.ms_per_word, config.min_client_ms)
    }

    fn estimate(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis((words * self.ms_per_word).max(self.min_ms))
    }
}

#[async_trait]
impl SpeechSynthesizer for ClientSideSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedSpeech> {
        Ok(SynthesizedSpeech::ClientRendered {
            estimated: self.estimate(&request.text),
        })
    }

    fn name(&self) -> &str {
        "client"
    }
}
