//! Core traits and types for the call media gateway
//!
//! This crate provides foundational types used across all other crates:
//! - PCM audio constants and the silence classifier
//! - Tenant, transcript and dialogue types
//! - Service traits for pluggable backends (recognition, synthesis, dialogue,
//!   telephony control, tenant directory, conversation log)
//! - Error types

pub mod audio;
pub mod conversation;
pub mod dialogue;
pub mod error;
pub mod tenant;
pub mod traits;
pub mod transcript;

pub use audio::{
    chunk_duration, is_silence, mean_amplitude, BYTES_PER_SAMPLE, PLAYBACK_CHUNK_BYTES,
    SAMPLE_RATE_HZ, SILENCE_AMPLITUDE_THRESHOLD,
};
pub use conversation::{ConversationEntry, Speaker};
pub use dialogue::{
    is_end_of_call, AgentReply, AgentResponse, SessionAttributes, APOLOGY_TEXT,
    ATTR_TENANT_ID, ATTR_TENANT_NAME, END_OF_CALL_PHRASES,
};
pub use error::{Error, Result};
pub use tenant::{SynthesisEngine, TenantProfile, DEFAULT_TENANT_ID};
pub use transcript::{RecognitionAlternative, RecognitionResult, TranscriptEvent};

pub use traits::{
    ConversationLog, DialogueService, RecognitionEvents, RecognitionMode, RecognitionSink,
    RecognitionStream, SpeechRecognizer, SpeechSynthesizer, SynthesisRequest,
    SynthesizedSpeech, TelephonyControl, TenantResolver,
};
