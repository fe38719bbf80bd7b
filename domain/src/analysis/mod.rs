//! Post-turn analysis domain.
//!
//! - [`entities::FeedbackResult`] / [`entities::SuggestionResult`]: analysis payloads
//! - [`parsing`]: extraction of those payloads from model replies

pub mod entities;
pub mod parsing;
