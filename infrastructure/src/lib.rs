//! Infrastructure layer for parley
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod providers;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileEngineConfig, FileLoggingConfig, FileProviderConfig,
    FileServerConfig, FileTranscriptConfig,
};
pub use logging::JsonlTranscriptStore;
pub use providers::openai::{OpenAiGateway, OpenAiGatewayConfig, ProviderError};
