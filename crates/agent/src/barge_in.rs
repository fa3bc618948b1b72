//! Barge-in coordination
//!
//! Caller speech during playback clears the speaking state, which the
//! playback engine observes before its next chunk, and asks the switch to
//! stop any media it is playing. The switch request is fire-and-forget.

use media_gateway_core::TelephonyControl;
use media_gateway_pipeline::SpeakingState;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

pub struct BargeInCoordinator {
    call_id: String,
    speaking: Arc<SpeakingState>,
    telephony: Arc<dyn TelephonyControl>,
    tasks: TaskTracker,
}

impl BargeInCoordinator {
    pub fn new(
        call_id: impl Into<String>,
        speaking: Arc<SpeakingState>,
        telephony: Arc<dyn TelephonyControl>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            speaking,
            telephony,
            tasks,
        }
    }

    /// Returns whether playback was interrupted
    pub fn on_speech_start(&self) -> bool {
        if !self.speaking.interrupt() {
            return false;
        }

        metrics::counter!("gateway_barge_in_total").increment(1);
        tracing::info!(call_id = %self.call_id, "Barge-in, playback interrupted");

        if self.telephony.is_enabled() {
            let telephony = self.telephony.clone();
            let call_id = self.call_id.clone();
            self.tasks.spawn(async move {
                if let Err(e) = telephony.interrupt_playback(&call_id).await {
                    tracing::warn!(call_id = %call_id, error = %e, "Switch playback interrupt failed");
                }
            });
        }
        true
    }
}
