//! Application-level configuration.
//!
//! This module provides configuration types that control how the engine
//! behaves, such as turn time limits and session retention.

use std::time::Duration;

const DEFAULT_MAX_TURN_SECS: u64 = 120;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_CHUNK_BUFFER: usize = 32;

/// Engine behavior configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the streaming phase of one turn. `None` disables it.
    pub max_turn_duration: Option<Duration>,
    /// Upper bound on one analysis round trip. `None` disables it.
    pub analysis_timeout: Option<Duration>,
    /// Idle time after which a session may be evicted (best-effort).
    pub session_ttl: Duration,
    /// Capacity of the bounded chunk channel between a turn and its caller.
    pub chunk_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turn_duration: Some(Duration::from_secs(DEFAULT_MAX_TURN_SECS)),
            analysis_timeout: Some(Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            chunk_buffer: DEFAULT_CHUNK_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Set the turn limit in seconds; `0` disables it.
    pub fn with_max_turn_seconds(mut self, seconds: u64) -> Self {
        self.max_turn_duration = (seconds > 0).then(|| Duration::from_secs(seconds));
        self
    }

    /// Set the analysis limit in seconds; `0` disables it.
    pub fn with_analysis_timeout_seconds(mut self, seconds: u64) -> Self {
        self.analysis_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_chunk_buffer(mut self, capacity: usize) -> Self {
        self.chunk_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seconds_disables_limits() {
        let config = EngineConfig::default()
            .with_max_turn_seconds(0)
            .with_analysis_timeout_seconds(0);
        assert!(config.max_turn_duration.is_none());
        assert!(config.analysis_timeout.is_none());
    }

    #[test]
    fn chunk_buffer_never_zero() {
        assert_eq!(EngineConfig::default().with_chunk_buffer(0).chunk_buffer, 1);
    }
}
