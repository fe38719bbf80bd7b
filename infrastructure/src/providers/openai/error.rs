//! Error types for the OpenAI-compatible adapter

use parley_application::GatewayError;
use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when talking to the provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider error: {0}")]
    Api(String),

    #[error("Stream ended before completion")]
    Truncated,

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Request timeout")]
    Timeout,
}

impl From<ProviderError> for GatewayError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout => GatewayError::Timeout,
            ProviderError::Http(err) if err.is_timeout() => GatewayError::Timeout,
            ProviderError::Http(err) if err.is_connect() => {
                GatewayError::ConnectionError(err.to_string())
            }
            ProviderError::Truncated => GatewayError::TransportClosed,
            other => GatewayError::RequestFailed(other.to_string()),
        }
    }
}
