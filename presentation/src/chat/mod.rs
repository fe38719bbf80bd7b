//! Interactive chat module
//!
//! Provides a readline-based chat with one persona, plus slash commands for
//! feedback and coaching.

mod repl;

pub use repl::ChatRepl;
