//! Per-call session and playback timing

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Call session timing and queue sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Capacity of the inbound audio queue (chunks)
    #[serde(default = "default_audio_queue_capacity")]
    pub audio_queue_capacity: usize,

    /// Delay before the greeting is sent
    #[serde(default = "default_greeting_delay_ms")]
    pub greeting_delay_ms: u64,

    /// Also synthesize the greeting as call audio
    #[serde(default)]
    pub speak_greeting: bool,

    /// Idle read deadline with streaming recognition
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Idle read deadline when transcripts are injected by the client
    #[serde(default = "default_injected_read_timeout_secs")]
    pub injected_read_timeout_secs: u64,

    /// Delay between a handoff response and hang-up
    #[serde(default = "default_handoff_grace_ms")]
    pub handoff_grace_ms: u64,

    /// Delay between an end-of-call response and hang-up
    #[serde(default = "default_end_of_call_grace_ms")]
    pub end_of_call_grace_ms: u64,

    /// Upper bound on tenant resolution
    #[serde(default = "default_tenant_timeout_ms")]
    pub tenant_timeout_ms: u64,
}

fn default_audio_queue_capacity() -> usize {
    128
}
fn default_greeting_delay_ms() -> u64 {
    500
}
fn default_read_timeout_secs() -> u64 {
    30
}
fn default_injected_read_timeout_secs() -> u64 {
    300
}
fn default_handoff_grace_ms() -> u64 {
    2000
}
fn default_end_of_call_grace_ms() -> u64 {
    3000
}
fn default_tenant_timeout_ms() -> u64 {
    5000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            audio_queue_capacity: default_audio_queue_capacity(),
            greeting_delay_ms: default_greeting_delay_ms(),
            speak_greeting: false,
            read_timeout_secs: default_read_timeout_secs(),
            injected_read_timeout_secs: default_injected_read_timeout_secs(),
            handoff_grace_ms: default_handoff_grace_ms(),
            end_of_call_grace_ms: default_end_of_call_grace_ms(),
            tenant_timeout_ms: default_tenant_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn read_timeout(&self, injected: bool) -> Duration {
        if injected {
            Duration::from_secs(self.injected_read_timeout_secs)
        } else {
            Duration::from_secs(self.read_timeout_secs)
        }
    }

    pub fn handoff_grace(&self) -> Duration {
        Duration::from_millis(self.handoff_grace_ms)
    }

    pub fn end_of_call_grace(&self) -> Duration {
        Duration::from_millis(self.end_of_call_grace_ms)
    }

    pub fn tenant_timeout(&self) -> Duration {
        Duration::from_millis(self.tenant_timeout_ms)
    }
}

/// Outbound playback pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Bytes per outbound audio frame
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Pause after each frame
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Estimated speaking time per word for client-rendered speech
    #[serde(default = "default_ms_per_word")]
    pub ms_per_word: u64,

    /// Minimum estimated duration for client-rendered speech
    #[serde(default = "default_min_client_ms")]
    pub min_client_ms: u64,
}

fn default_chunk_bytes() -> usize {
    3200
}
fn default_pacing_ms() -> u64 {
    20
}
fn default_ms_per_word() -> u64 {
    300
}
fn default_min_client_ms() -> u64 {
    2000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: default_chunk_bytes(),
            pacing_ms: default_pacing_ms(),
            ms_per_word: default_ms_per_word(),
            min_client_ms: default_min_client_ms(),
        }
    }
}

impl PlaybackConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}
