//! HTTP synthesis backend
//!
//! `POST {url}/v1/synthesize` returns raw 8 kHz PCM as a streamed body, which
//! is handed to playback as an `AsyncRead` without buffering the whole clip.

use async_trait::async_trait;
use futures::TryStreamExt;
use media_gateway_config::SynthesisConfig;
use media_gateway_core::{Error, Result, SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech};
use serde::Serialize;
use std::time::Duration;
use tokio_util::io::StreamReader;

use crate::PipelineError;

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    voice_id: &'a str,
    engine: &'a str,
    output_format: &'static str,
    sample_rate: String,
}

pub struct HttpSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpSynthesizer {
    pub fn new(base_url: &str, timeout: Duration) -> std::result::Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Tts(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/synthesize", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn from_config(config: &SynthesisConfig) -> std::result::Result<Self, PipelineError> {
        Self::new(&config.url, config.timeout())
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedSpeech> {
        let body = SynthesizeBody {
            text: &request.text,
            voice_id: &request.voice_id,
            engine: request.engine.as_str(),
            output_format: "pcm",
            sample_rate: request.sample_rate.to_string(),
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(&self.endpoint).json(&body).send(),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))?
        .map_err(|e| Error::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("status {}: {}", status, detail)));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(SynthesizedSpeech::Pcm(Box::pin(StreamReader::new(stream))))
    }

    fn name(&self) -> &str {
        "http"
    }
}
