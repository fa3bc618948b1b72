//! Conversation log storage trait

use crate::conversation::ConversationEntry;
use crate::Result;
use async_trait::async_trait;

/// Append-only per-call conversation log
#[async_trait]
pub trait ConversationLog: Send + Sync + 'static {
    async fn append(&self, call_id: &str, entry: &ConversationEntry) -> Result<()>;
}
