//! Conversational agent trait

use crate::dialogue::{AgentReply, SessionAttributes};
use crate::Result;
use async_trait::async_trait;

/// Conversational agent interface
///
/// One agent session per call, keyed by the call id.
#[async_trait]
pub trait DialogueService: Send + Sync + 'static {
    /// Submit one caller utterance and wait for the completion
    async fn invoke(
        &self,
        session_id: &str,
        input: &str,
        attributes: &SessionAttributes,
    ) -> Result<AgentReply>;

    /// End the agent session. Best effort.
    async fn end_session(&self, _session_id: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}
