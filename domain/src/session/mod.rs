//! Conversation session domain.
//!
//! - [`entities::Message`]: a single message within a session
//! - [`log::ConversationLog`]: the append-only record of one session
//! - [`stream::StreamEvent`]: incremental events of a streaming reply

pub mod entities;
pub mod log;
pub mod stream;
