//! Scripted appointment dialogue
//!
//! Keyword-driven replies that walk a caller through booking a visit. Used
//! when no hosted agent is configured.

use async_trait::async_trait;
use media_gateway_core::{AgentReply, DialogueService, Result, SessionAttributes};

use crate::signals::interpret_reply;

const OFFER_BOOKING: &str =
    "I'd be happy to help you book an appointment. What day works best for you?";
const OFFER_SLOTS: &str = "Let me check our availability for tomorrow morning. I have slots at 9 AM, 9:30 AM, and 10 AM. Which would you prefer?";
const ASK_NAME: &str =
    "Perfect! I can book you for 9:30 AM tomorrow. May I have your full name please?";
const ASK_EMAIL: &str = "Thank you! And what's the best email address to send your confirmation?";
const CONFIRM: &str = "Perfect! I've booked your appointment for tomorrow at 9:30 AM. Your confirmation number is APPT-1220-001. You'll receive an email confirmation shortly. Is there anything else I can help you with?";
const DEFAULT_REPLY: &str = "I understand. How can I help you today?";
const TRANSFER: &str = "Of course. Let me transfer you to our human receptionist now.";
const FAREWELL: &str = "Thank you for calling, have a great day!";

const TRANSFER_KEYWORDS: &[&str] = &["receptionist", "real person", "speak to someone", "operator"];
const FAREWELL_KEYWORDS: &[&str] = &["no thank", "that's all", "that is all", "bye"];
const BOOKING_KEYWORDS: &[&str] = &["appointment", "book"];
const SLOT_KEYWORDS: &[&str] = &["tomorrow", "morning"];
const TIME_KEYWORDS: &[&str] = &["9:30", "930"];
const EMAIL_KEYWORDS: &[&str] = &["@", "email"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedDialogue;

impl ScriptedDialogue {
    pub fn new() -> Self {
        Self
    }

    /// Pick the scripted reply for one utterance
    pub fn reply_for(&self, utterance: &str) -> &'static str {
        let lower = utterance.to_lowercase();
        let has = |keywords: &[&str]| contains_any(&lower, keywords);

        if has(TRANSFER_KEYWORDS) {
            TRANSFER
        } else if has(FAREWELL_KEYWORDS) {
            FAREWELL
        } else if has(BOOKING_KEYWORDS) {
            OFFER_BOOKING
        } else if has(SLOT_KEYWORDS) {
            OFFER_SLOTS
        } else if has(TIME_KEYWORDS) {
            ASK_NAME
        } else if lower.contains("name") || utterance.split_whitespace().count() >= 2 {
            ASK_EMAIL
        } else if has(EMAIL_KEYWORDS) {
            CONFIRM
        } else {
            DEFAULT_REPLY
        }
    }
}

#[async_trait]
impl DialogueService for ScriptedDialogue {
    async fn invoke(
        &self,
        session_id: &str,
        input: &str,
        _attributes: &SessionAttributes,
    ) -> Result<AgentReply> {
        let reply = self.reply_for(input);
        tracing::debug!(session_id = %session_id, reply, "Scripted dialogue reply");
        Ok(interpret_reply(AgentReply::text(reply)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
