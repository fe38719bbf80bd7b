//! Presentation layer for parley
//!
//! This crate contains CLI definitions, the HTTP API, console formatting
//! and the interactive chat interface.

pub mod chat;
pub mod cli;
pub mod http;
pub mod output;

// Re-export commonly used types
pub use chat::ChatRepl;
pub use cli::commands::{Cli, Command};
pub use http::{ApiError, AppState, build_router};
pub use output::console::ConsoleFormatter;
