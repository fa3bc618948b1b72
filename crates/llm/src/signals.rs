//! Handoff detection on agent completions

use media_gateway_core::AgentReply;

/// Completion phrases that mean the agent is handing the caller to a person
pub const HANDOFF_PHRASES: &[&str] = &[
    "connect you with a human",
    "transfer you to",
    "human receptionist",
    "transfer_to_human",
    "handoff_initiated",
];

pub fn detect_handoff(completion: &str) -> bool {
    let lower = completion.to_lowercase();
    HANDOFF_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Trim the completion and infer a handoff from its wording
pub fn interpret_reply(mut reply: AgentReply) -> AgentReply {
    reply.completion = reply.completion.trim().to_string();
    if !reply.requires_handoff && detect_handoff(&reply.completion) {
        reply.requires_handoff = true;
        reply
            .handoff_reason
            .get_or_insert_with(|| "Agent initiated handoff".to_string());
    }
    reply
}
