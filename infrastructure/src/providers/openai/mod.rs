//! OpenAI-compatible Chat Completions adapter
//!
//! Works against api.openai.com and any server exposing the same streaming
//! API (vLLM, Ollama, LM Studio, gateways).

pub mod error;
pub mod gateway;
pub mod protocol;
pub mod sse;

pub use error::ProviderError;
pub use gateway::{OpenAiGateway, OpenAiGatewayConfig};
