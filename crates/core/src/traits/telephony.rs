//! Out-of-band telephony switch control

use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Control channel to the telephony switch
#[async_trait]
pub trait TelephonyControl: Send + Sync + 'static {
    /// Stop any media the switch is playing into the call
    async fn interrupt_playback(&self, call_id: &str) -> Result<()>;

    /// Channel variables for the call
    async fn channel_info(&self, call_id: &str) -> Result<BTreeMap<String, String>>;

    /// Hang up the call on the switch
    async fn hangup(&self, call_id: &str) -> Result<()>;

    /// Whether a switch is configured at all
    fn is_enabled(&self) -> bool {
        true
    }
}
