//! Analysis value objects

use serde::{Deserialize, Serialize};

/// Realtime feedback on the latest user/AI exchange (Value Object)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackResult {
    /// One or two sentence assessment of the user's last message.
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    /// Score from 1 to 10, when the model gave one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

impl FeedbackResult {
    /// Feedback consisting only of a free-form summary.
    pub fn from_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

/// Coaching suggestion for the user's next message (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionResult {
    /// The message the user could send next.
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl SuggestionResult {
    pub fn new(suggestion: impl Into<String>) -> Self {
        Self {
            suggestion: suggestion.into(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}
