//! Conversation log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Caller,
    Agent,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Caller => "User",
            Speaker::Agent => "AI",
        }
    }
}

/// One line of a call transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn now(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// `[HH:MM:SS] User: text`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}: {}\n",
            self.at.format("%H:%M:%S"),
            self.speaker.label(),
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_line() {
        let entry = ConversationEntry {
            speaker: Speaker::Caller,
            text: "I need an appointment".to_string(),
            at: Utc.with_ymd_and_hms(2024, 3, 1, 15, 4, 5).unwrap(),
        };
        assert_eq!(entry.format_line(), "[15:04:05] User: I need an appointment\n");

        let reply = ConversationEntry { speaker: Speaker::Agent, ..entry };
        assert!(reply.format_line().contains("] AI: "));
    }
}
