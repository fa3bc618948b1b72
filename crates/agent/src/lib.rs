//! Call session orchestration
//!
//! Features:
//! - Call session manager with a registry of active calls
//! - Audio ingress with bounded, drop-on-full queueing
//! - Sequential dialogue turns with apology fallback and grace-delayed hang-up
//! - Barge-in: local playback preemption plus out-of-band switch interrupt
//! - Tenant resolution chain with a default tenant
//! - Best-effort conversation logging

pub mod barge_in;
pub mod conversation_log;
pub mod ingress;
pub mod services;
pub mod session;
pub mod tenant;
pub mod turn;

pub use barge_in::BargeInCoordinator;
pub use conversation_log::{create_conversation_log, FileConversationLog, NullConversationLog};
pub use ingress::{AudioIngress, IngressExit, IngressStats};
pub use services::SessionServices;
pub use session::{CallInfo, CallSession, CallSessionManager, EndReason};
pub use tenant::{
    fallback_profile, HttpTenantResolver, StaticTenantDirectory, TenantDirectory, TenantRecord,
};
pub use turn::{DialogueTurnController, TurnSubmitter};

use media_gateway_llm::LlmError;
use media_gateway_pipeline::PipelineError;
use media_gateway_transport::TransportError;
use thiserror::Error;

/// Session orchestration errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tenant directory error: {0}")]
    Tenant(String),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Dialogue error: {0}")]
    Dialogue(#[from] LlmError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Session manager is shutting down")]
    ShuttingDown,
}

impl From<AgentError> for media_gateway_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Tenant(msg) => media_gateway_core::Error::Tenant(msg),
            AgentError::Pipeline(e) => e.into(),
            AgentError::Dialogue(e) => e.into(),
            AgentError::Transport(e) => e.into(),
            AgentError::CallNotFound(id) => {
                media_gateway_core::Error::Transport(format!("call not found: {}", id))
            }
            AgentError::ShuttingDown => media_gateway_core::Error::ChannelClosed,
        }
    }
}
