//! Application layer for parley
//!
//! This crate contains the session registry, use cases, port definitions,
//! and engine configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineConfig;
pub use ports::{
    generation_gateway::{GatewayError, GenerationGateway, GenerationRequest, StreamHandle},
    transcript_store::{NoTranscriptStore, TranscriptEvent, TranscriptStore},
};
pub use registry::{SessionError, SessionRegistry, StreamSlot};
pub use use_cases::analyze_turn::{AnalysisError, TurnAnalyzer};
pub use use_cases::stream_turn::{
    PendingTurn, StreamOrchestrator, TurnError, TurnEvent, TurnPhase, TurnRequest,
};
