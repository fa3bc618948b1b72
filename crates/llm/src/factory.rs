//! Dialogue backend selection

use media_gateway_config::{DialogueConfig, DialogueProvider};
use media_gateway_core::DialogueService;
use std::sync::Arc;

use crate::{HttpDialogueBackend, LlmError, ScriptedDialogue};

/// Build the configured dialogue backend
pub fn create_dialogue(config: &DialogueConfig) -> Result<Arc<dyn DialogueService>, LlmError> {
    match config.provider {
        DialogueProvider::Http => {
            tracing::info!(
                endpoint = %config.endpoint,
                agent_id = %config.agent_id,
                alias_id = %config.alias_id,
                "Using hosted dialogue agent"
            );
            Ok(Arc::new(HttpDialogueBackend::new(config)?))
        }
        DialogueProvider::Scripted => {
            tracing::info!("Using scripted dialogue");
            Ok(Arc::new(ScriptedDialogue::new()))
        }
    }
}
