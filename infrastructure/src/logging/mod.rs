//! Transcript persistence.
//!
//! Provides [`JsonlTranscriptStore`], an append-only JSONL writer that
//! implements the [`TranscriptStore`](parley_application::TranscriptStore) port.

mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscriptStore;
