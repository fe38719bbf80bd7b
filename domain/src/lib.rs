//! Domain layer for parley
//!
//! This crate contains the conversation entities and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation
//!
//! A session is a single ongoing conversation with one persona. Its
//! [`ConversationLog`] is an append-only sequence of [`Message`]s where
//! insertion order is conversation order.
//!
//! ## Streaming
//!
//! AI replies arrive as a sequence of [`StreamEvent`]s: suffix-appending
//! `Delta` fragments followed by exactly one terminal event.
//!
//! ## Analysis
//!
//! After a turn commits, the latest exchange can be analyzed into a
//! [`FeedbackResult`] and the whole history into a [`SuggestionResult`].

pub mod analysis;
pub mod config;
pub mod core;
pub mod prompt;
pub mod session;
pub mod util;

// Re-export commonly used types
pub use analysis::{
    entities::{FeedbackResult, SuggestionResult},
    parsing::{parse_feedback_response, parse_suggestion_response},
};
pub use config::validation::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::error::DomainError;
pub use prompt::PromptTemplate;
pub use session::{
    entities::{Message, Sender},
    log::{ConversationLog, PersonaContext},
    stream::StreamEvent,
};
