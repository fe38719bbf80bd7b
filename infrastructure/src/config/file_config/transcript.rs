//! Transcript and log file configuration (`[transcript]`, `[logging]` sections)

use parley_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTranscriptConfig {
    /// Write committed turns to a JSONL file
    pub enabled: bool,
    pub path: String,
}

impl Default for FileTranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "parley.transcript.jsonl".to_string(),
        }
    }
}

impl FileTranscriptConfig {
    /// Path to write to, or `None` when transcripts are off.
    pub fn active_path(&self) -> Option<PathBuf> {
        (self.enabled && !self.path.trim().is_empty()).then(|| PathBuf::from(self.path.trim()))
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        if self.enabled && self.path.trim().is_empty() {
            return vec![ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "transcript.path".to_string(),
                },
                "transcript.enabled is set but transcript.path is empty",
            )];
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily-rotated log files; stderr only when unset.
    pub dir: Option<String>,
}
