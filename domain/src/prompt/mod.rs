//! Prompt domain
//!
//! Templates for coaching turns and post-turn analysis.

mod template;

pub use template::PromptTemplate;
