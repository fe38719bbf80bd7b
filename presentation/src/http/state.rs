//! Shared handler state

use parley_application::{SessionRegistry, StreamOrchestrator, TurnAnalyzer};
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: StreamOrchestrator,
    pub analyzer: TurnAnalyzer,
}

impl AppState {
    pub fn new(orchestrator: StreamOrchestrator, analyzer: TurnAnalyzer) -> Self {
        Self {
            orchestrator,
            analyzer,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.orchestrator.registry()
    }
}
