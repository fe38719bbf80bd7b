//! Port for durable transcript recording.
//!
//! Defines the [`TranscriptStore`] trait, the narrow append interface through
//! which committed turns (and session lifecycle events) reach durable storage.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the
//! conversation itself in a machine-readable form.

use serde_json::Value;

/// A structured transcript event.
///
/// Each event has a type string, the session it belongs to, and a JSON
/// payload containing event-specific fields.
pub struct TranscriptEvent {
    /// Event type identifier (e.g., "session_created", "turn_committed").
    pub event_type: &'static str,
    pub session_id: String,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl TranscriptEvent {
    pub fn new(event_type: &'static str, session_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            payload,
        }
    }
}

/// Port for appending transcript events to durable storage.
///
/// `record` is synchronous and infallible. A storage failure never changes
/// the outcome of a turn; implementations log it themselves.
pub trait TranscriptStore: Send + Sync {
    fn record(&self, event: TranscriptEvent);
}

/// No-op implementation for tests and when transcripts are disabled.
pub struct NoTranscriptStore;

impl TranscriptStore for NoTranscriptStore {
    fn record(&self, _event: TranscriptEvent) {}
}
