//! Service traits for pluggable backends
//!
//! Every external collaborator of a call session sits behind one of these
//! traits so that real and simulated implementations can be selected once at
//! startup and injected into the session manager.

mod dialogue;
mod speech;
mod storage;
mod telephony;
mod tenant;

pub use dialogue::DialogueService;
pub use speech::{
    RecognitionEvents, RecognitionMode, RecognitionSink, RecognitionStream, SpeechRecognizer,
    SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech,
};
pub use storage::ConversationLog;
pub use telephony::TelephonyControl;
pub use tenant::TenantResolver;
