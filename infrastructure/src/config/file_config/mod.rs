//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section defaults, so a partial file (or none) is valid.

mod engine;
mod provider;
mod server;
mod transcript;

pub use engine::FileEngineConfig;
pub use provider::FileProviderConfig;
pub use server::FileServerConfig;
pub use transcript::{FileLoggingConfig, FileTranscriptConfig};

use parley_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// HTTP server settings
    pub server: FileServerConfig,
    /// Upstream generation provider
    pub provider: FileProviderConfig,
    /// Turn limits and session retention
    pub engine: FileEngineConfig,
    /// JSONL transcript output
    pub transcript: FileTranscriptConfig,
    /// Log file output
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// The API key check is separate (see
    /// [`FileProviderConfig::check_api_key`]) because it reads the environment.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.server.parse_bind().1);
        issues.extend(self.provider.validate());
        issues.extend(self.engine.validate());
        issues.extend(self.transcript.validate());
        issues
    }
}
