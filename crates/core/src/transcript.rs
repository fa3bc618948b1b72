//! Recognition results and the transcript events derived from them

use serde::{Deserialize, Serialize};

/// One recognition hypothesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
}

/// A single result from the recognition stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecognitionResult {
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
}

impl RecognitionResult {
    pub fn partial(text: impl Into<String>) -> Self {
        Self::single(true, text.into())
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self::single(false, text.into())
    }

    fn single(is_partial: bool, transcript: String) -> Self {
        Self {
            is_partial,
            alternatives: vec![RecognitionAlternative { transcript }],
        }
    }

    /// Text of the first alternative, if non-empty
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives
            .first()
            .map(|alt| alt.transcript.as_str())
            .filter(|text| !text.is_empty())
    }
}

/// Events emitted by the transcription bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// First non-empty result of an utterance
    SpeechStarted,
    Partial(String),
    /// Completed utterance; consumed exactly once
    Final(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_transcript() {
        assert_eq!(RecognitionResult::partial("hel").best_transcript(), Some("hel"));
        assert_eq!(RecognitionResult::final_result("").best_transcript(), None);
        assert_eq!(RecognitionResult::default().best_transcript(), None);
    }

    #[test]
    fn test_deserialize_wire_result() {
        let raw = r#"{"is_partial":false,"alternatives":[{"transcript":"book a visit"},{"transcript":"look a visit"}]}"#;
        let result: RecognitionResult = serde_json::from_str(raw).unwrap();
        assert!(!result.is_partial);
        assert_eq!(result.best_transcript(), Some("book a visit"));
    }
}
