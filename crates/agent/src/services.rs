//! Service handles injected into the session manager
//!
//! Real or simulated implementations are chosen once here, from settings.

use media_gateway_config::Settings;
use media_gateway_core::{
    ConversationLog, DialogueService, SpeechRecognizer, SpeechSynthesizer, TelephonyControl,
};
use media_gateway_llm::create_dialogue;
use media_gateway_pipeline::{create_recognizer, create_synthesizer};
use media_gateway_transport::{DisabledTelephony, EslClient};
use std::sync::Arc;

use crate::conversation_log::{create_conversation_log, NullConversationLog};
use crate::tenant::TenantDirectory;
use crate::AgentError;

#[derive(Clone)]
pub struct SessionServices {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub dialogue: Arc<dyn DialogueService>,
    pub tenants: Arc<TenantDirectory>,
    pub telephony: Arc<dyn TelephonyControl>,
    pub conversation_log: Arc<dyn ConversationLog>,
}

impl SessionServices {
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        dialogue: Arc<dyn DialogueService>,
        tenants: Arc<TenantDirectory>,
    ) -> Self {
        Self {
            recognizer,
            synthesizer,
            dialogue,
            tenants,
            telephony: Arc::new(DisabledTelephony),
            conversation_log: Arc::new(NullConversationLog),
        }
    }

    pub fn with_telephony(mut self, telephony: Arc<dyn TelephonyControl>) -> Self {
        self.telephony = telephony;
        self
    }

    pub fn with_conversation_log(mut self, log: Arc<dyn ConversationLog>) -> Self {
        self.conversation_log = log;
        self
    }

    /// Build every service from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, AgentError> {
        let recognizer = create_recognizer(&settings.recognition);
        let synthesizer = create_synthesizer(&settings.synthesis, &settings.playback)?;
        let dialogue = create_dialogue(&settings.dialogue)?;
        let tenants = TenantDirectory::from_config(&settings.tenants, settings.session.tenant_timeout())?;

        let telephony: Arc<dyn TelephonyControl> = if settings.telephony.enabled {
            tracing::info!(address = %settings.telephony.address(), "Telephony control enabled");
            Arc::new(EslClient::from_config(&settings.telephony))
        } else {
            tracing::info!("Telephony control disabled");
            Arc::new(DisabledTelephony)
        };

        Ok(Self {
            recognizer,
            synthesizer,
            dialogue,
            tenants: Arc::new(tenants),
            telephony,
            conversation_log: create_conversation_log(&settings.conversation_log),
        })
    }
}
