//! Dialogue agent replies and their interpretation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attributes passed to the agent with every turn
pub type SessionAttributes = BTreeMap<String, String>;

pub const ATTR_TENANT_ID: &str = "tenant_id";
pub const ATTR_TENANT_NAME: &str = "tenant_name";

/// Spoken when the agent call fails
pub const APOLOGY_TEXT: &str =
    "I'm sorry, I'm having trouble right now. Could you please repeat that?";

/// Phrases that close the call once spoken
pub const END_OF_CALL_PHRASES: &[&str] = &[
    "have a great day",
    "goodbye",
    "take care",
    "thank you for calling",
];

/// Case-insensitive substring match against the end-of-call phrases
pub fn is_end_of_call(text: &str) -> bool {
    let lower = text.to_lowercase();
    END_OF_CALL_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Raw reply from a dialogue backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentReply {
    pub completion: String,
    #[serde(default)]
    pub requires_handoff: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_reason: Option<String>,
}

impl AgentReply {
    pub fn text(completion: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
            ..Default::default()
        }
    }
}

/// Interpreted agent response for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResponse {
    pub completion: String,
    pub requires_handoff: bool,
    pub handoff_reason: Option<String>,
    pub end_of_call: bool,
}

impl AgentResponse {
    pub fn from_reply(reply: AgentReply) -> Self {
        let end_of_call = is_end_of_call(&reply.completion);
        Self {
            completion: reply.completion,
            requires_handoff: reply.requires_handoff,
            handoff_reason: reply.handoff_reason,
            end_of_call,
        }
    }

    /// Local fallback when the agent is unavailable
    pub fn apology() -> Self {
        Self {
            completion: APOLOGY_TEXT.to_string(),
            requires_handoff: false,
            handoff_reason: None,
            end_of_call: false,
        }
    }

    /// Whether the call should be cancelled after this response is spoken
    pub fn closes_call(&self) -> bool {
        self.requires_handoff || self.end_of_call
    }
}
