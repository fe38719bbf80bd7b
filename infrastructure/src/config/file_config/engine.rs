//! Engine configuration from TOML (`[engine]` section)

use parley_application::EngineConfig;
use parley_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Upper bound on one streaming turn; 0 disables it.
    pub max_turn_secs: u64,
    /// Longest silence between two provider chunks.
    pub chunk_timeout_secs: u64,
    /// Idle time before a session may be evicted.
    pub session_ttl_secs: u64,
    /// How often `parley serve` sweeps idle sessions.
    pub sweep_interval_secs: u64,
    /// Capacity of the per-turn chunk channel.
    pub chunk_buffer: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            max_turn_secs: 120,
            chunk_timeout_secs: 30,
            session_ttl_secs: 3600,
            sweep_interval_secs: 60,
            chunk_buffer: 32,
        }
    }
}

impl FileEngineConfig {
    /// Analysis calls share the provider's request timeout.
    pub fn to_engine_config(&self, analysis_timeout_secs: u64) -> EngineConfig {
        EngineConfig::default()
            .with_max_turn_seconds(self.max_turn_secs)
            .with_analysis_timeout_seconds(analysis_timeout_secs)
            .with_session_ttl(Duration::from_secs(self.session_ttl_secs))
            .with_chunk_buffer(self.chunk_buffer)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("engine.chunk_timeout_secs", self.chunk_timeout_secs),
            ("engine.session_ttl_secs", self.session_ttl_secs),
            ("engine.sweep_interval_secs", self.sweep_interval_secs),
            ("engine.chunk_buffer", self.chunk_buffer as u64),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroValue {
                        field: field.to_string(),
                    },
                    format!("{} must be greater than 0", field),
                ));
            }
        }

        if self.max_turn_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroValue {
                    field: "engine.max_turn_secs".to_string(),
                },
                "engine.max_turn_secs is 0: turns are only bounded by the chunk timeout",
            ));
        }

        issues
    }
}
