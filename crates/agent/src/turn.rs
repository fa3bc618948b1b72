//! Dialogue turns
//!
//! Final transcripts are queued to one worker per call, so at most one turn
//! is in flight. A turn submits the utterance to the agent, speaks the
//! response, and schedules hang-up when the response asks for it.

use media_gateway_core::{
    AgentResponse, ConversationEntry, ConversationLog, DialogueService, SessionAttributes,
    Speaker, TenantProfile, ATTR_TENANT_ID, ATTR_TENANT_NAME,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;

use crate::session::EndReason;

/// Producer side of the per-call turn queue
///
/// Unbounded: every final utterance gets its turn, however slow the agent.
/// The queue lives only as long as the call.
#[derive(Clone)]
pub struct TurnSubmitter {
    call_id: Arc<str>,
    sender: mpsc::UnboundedSender<String>,
}

impl TurnSubmitter {
    pub fn channel(call_id: &str) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let submitter = Self {
            call_id: Arc::from(call_id),
            sender,
        };
        (submitter, receiver)
    }

    /// Queue a final utterance. Never blocks; returns whether it was queued.
    pub fn submit(&self, utterance: String) -> bool {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return false;
        }
        match self.sender.send(utterance.to_string()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(call_id = %self.call_id, "Turn worker gone, ignoring utterance");
                false
            }
        }
    }
}

/// Submits utterances to the agent and interprets its replies
pub struct DialogueTurnController {
    call_id: String,
    attributes: SessionAttributes,
    dialogue: Arc<dyn DialogueService>,
    log: mpsc::UnboundedSender<ConversationEntry>,
}

impl DialogueTurnController {
    pub fn new(
        call_id: impl Into<String>,
        tenant: &TenantProfile,
        dialogue: Arc<dyn DialogueService>,
        log: Arc<dyn ConversationLog>,
        tasks: TaskTracker,
    ) -> Self {
        let mut attributes = SessionAttributes::new();
        attributes.insert(ATTR_TENANT_ID.to_string(), tenant.tenant_id.clone());
        attributes.insert(ATTR_TENANT_NAME.to_string(), tenant.display_name.clone());

        let call_id = call_id.into();
        let (entries, pending) = mpsc::unbounded_channel();
        tasks.spawn(write_conversation(log, call_id.clone(), pending));

        Self {
            call_id,
            attributes,
            dialogue,
            log: entries,
        }
    }

    pub fn attributes(&self) -> &SessionAttributes {
        &self.attributes
    }

    /// Run one turn. Agent failures yield the apology response; nothing is retried.
    pub async fn take_turn(&self, utterance: &str) -> AgentResponse {
        self.record(Speaker::Caller, utterance);
        metrics::counter!("gateway_dialogue_turns_total").increment(1);

        let started = Instant::now();
        let result = self
            .dialogue
            .invoke(&self.call_id, utterance, &self.attributes)
            .await;
        let latency = started.elapsed();
        metrics::histogram!("gateway_dialogue_latency_ms").record(latency.as_secs_f64() * 1000.0);

        let response = match result {
            Ok(reply) => AgentResponse::from_reply(reply),
            Err(e) => {
                metrics::counter!("gateway_dialogue_errors_total").increment(1);
                tracing::error!(
                    call_id = %self.call_id,
                    backend = self.dialogue.name(),
                    error = %e,
                    "Dialogue agent failed, apologizing"
                );
                AgentResponse::apology()
            }
        };

        tracing::info!(
            call_id = %self.call_id,
            latency_ms = latency.as_millis() as u64,
            handoff = response.requires_handoff,
            end_of_call = response.end_of_call,
            response = %response.completion,
            "Dialogue turn complete"
        );
        if let Some(reason) = &response.handoff_reason {
            tracing::info!(call_id = %self.call_id, reason = %reason, "Handoff requested");
        }

        self.record(Speaker::Agent, &response.completion);
        response
    }

    fn record(&self, speaker: Speaker, text: &str) {
        let _ = self.log.send(ConversationEntry::now(speaker, text));
    }
}

/// Appends entries in order until the controller is dropped
async fn write_conversation(
    log: Arc<dyn ConversationLog>,
    call_id: String,
    mut pending: mpsc::UnboundedReceiver<ConversationEntry>,
) {
    while let Some(entry) = pending.recv().await {
        if let Err(e) = log.append(&call_id, &entry).await {
            tracing::warn!(call_id = %call_id, error = %e, "Conversation log append failed");
        }
    }
}

/// Hang-ups a response schedules once it has been spoken, in firing order
pub fn closing_delays(
    response: &AgentResponse,
    handoff_grace: Duration,
    end_of_call_grace: Duration,
) -> Vec<(Duration, EndReason)> {
    let mut delays = Vec::with_capacity(2);
    if response.requires_handoff {
        delays.push((handoff_grace, EndReason::Handoff));
    }
    if response.end_of_call {
        delays.push((end_of_call_grace, EndReason::EndOfCall));
    }
    delays.sort_by_key(|(delay, _)| *delay);
    delays
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_gateway_core::{AgentReply, Error, Result, APOLOGY_TEXT};
    use parking_lot::Mutex;

    struct CannedDialogue {
        reply: Option<AgentReply>,
        seen: Mutex<Vec<(String, SessionAttributes)>>,
    }

    #[async_trait]
    impl DialogueService for CannedDialogue {
        async fn invoke(&self, session_id: &str, input: &str, attributes: &SessionAttributes) -> Result<AgentReply> {
            self.seen.lock().push((format!("{}:{}", session_id, input), attributes.clone()));
            self.reply
                .clone()
                .ok_or_else(|| Error::Dialogue("agent unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[derive(Default)]
    struct MemoryLog {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationLog for MemoryLog {
        async fn append(&self, call_id: &str, entry: &ConversationEntry) -> Result<()> {
            self.lines.lock().push(format!("{} {}", call_id, entry.format_line().trim_end()));
            Ok(())
        }
    }

    fn controller(reply: Option<AgentReply>) -> (DialogueTurnController, Arc<CannedDialogue>, Arc<MemoryLog>, TaskTracker) {
        let dialogue = Arc::new(CannedDialogue {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let log = Arc::new(MemoryLog::default());
        let tasks = TaskTracker::new();
        let tenant = TenantProfile {
            tenant_id: "riverside".to_string(),
            display_name: "Riverside Dental".to_string(),
            ..TenantProfile::fallback()
        };
        let controller = DialogueTurnController::new("call-1", &tenant, dialogue.clone(), log.clone(), tasks.clone());
        (controller, dialogue, log, tasks)
    }

    #[tokio::test]
    async fn test_turn_passes_tenant_attributes() {
        let (controller, dialogue, log, tasks) = controller(Some(AgentReply::text("Sure, what day works?")));

        let response = controller.take_turn("I need a cleaning").await;
        assert_eq!(response.completion, "Sure, what day works?");
        assert!(!response.closes_call());

        let seen = dialogue.seen.lock();
        assert_eq!(seen[0].0, "call-1:I need a cleaning");
        assert_eq!(seen[0].1.get(ATTR_TENANT_ID).map(String::as_str), Some("riverside"));
        assert_eq!(seen[0].1.get(ATTR_TENANT_NAME).map(String::as_str), Some("Riverside Dental"));
        drop(seen);

        drop(controller);
        tasks.close();
        tasks.wait().await;
        let lines = log.lines.lock();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("User: I need a cleaning"));
        assert!(lines[1].ends_with("AI: Sure, what day works?"));
    }

    #[tokio::test]
    async fn test_agent_failure_yields_apology() {
        let (controller, dialogue, _log, _tasks) = controller(None);

        let response = controller.take_turn("hello?").await;
        assert_eq!(response.completion, APOLOGY_TEXT);
        assert!(!response.closes_call());
        assert_eq!(dialogue.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_end_of_call_detected() {
        let (controller, _dialogue, _log, _tasks) =
            controller(Some(AgentReply::text("Thank you for calling, have a great day!")));
        let response = controller.take_turn("no, that's all").await;
        assert!(response.end_of_call);
        assert!(!response.requires_handoff);
    }

    #[test]
    fn test_closing_delays_both_fire() {
        let response = AgentResponse {
            completion: "Let me transfer you to the front desk. Goodbye".to_string(),
            requires_handoff: true,
            handoff_reason: None,
            end_of_call: true,
        };
        let delays = closing_delays(&response, Duration::from_secs(2), Duration::from_secs(3));
        assert_eq!(
            delays,
            vec![
                (Duration::from_secs(2), EndReason::Handoff),
                (Duration::from_secs(3), EndReason::EndOfCall),
            ]
        );
        assert!(closing_delays(&AgentResponse::apology(), Duration::ZERO, Duration::ZERO).is_empty());
    }

    #[tokio::test]
    async fn test_submitter_keeps_every_final() {
        let (submitter, mut rx) = TurnSubmitter::channel("call-1");
        for i in 0..50 {
            assert!(submitter.submit(format!("utterance {}", i)));
        }
        assert!(!submitter.submit("   ".to_string()));
        for i in 0..50 {
            assert_eq!(rx.recv().await.unwrap(), format!("utterance {}", i));
        }

        drop(rx);
        assert!(!submitter.submit("after hang-up".to_string()));
    }
}
