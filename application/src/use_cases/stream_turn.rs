//! Stream Turn use case.
//!
//! [`StreamOrchestrator`] drives one streaming turn through
//! `Idle → Acquiring → Streaming → Finalizing → {Committed | Aborted}`:
//!
//! 1. Validate the request (no side effects on failure)
//! 2. Take the session's stream slot, or fail with `SessionBusy`
//! 3. Relay provider chunks to the caller's bounded sink, in order
//! 4. Append the user message and the assembled AI message to the log
//! 5. Release the slot, then emit exactly one terminal event
//!
//! Nothing is appended unless the full reply arrived. The slot is held by a
//! [`StreamSlot`] guard, so it is released on every exit path including a
//! dropped future.

use crate::config::EngineConfig;
use crate::ports::generation_gateway::{
    GatewayError, GenerationGateway, GenerationRequest, StreamHandle,
};
use crate::ports::transcript_store::{NoTranscriptStore, TranscriptEvent, TranscriptStore};
use crate::registry::{SessionError, SessionRegistry, StreamSlot};
use parley_domain::util::{is_blank, truncate_str};
use parley_domain::{Message, PromptTemplate};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that end a turn
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("A turn is already streaming for session {0}")]
    SessionBusy(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out")]
    UpstreamTimeout,

    #[error("Caller disconnected")]
    Disconnected,
}

impl From<SessionError> for TurnError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidArgument(msg) => TurnError::InvalidArgument(msg),
            SessionError::NotFound(id) => TurnError::NotFound(id),
            SessionError::Busy(id) => TurnError::SessionBusy(id),
        }
    }
}

impl From<GatewayError> for TurnError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Timeout => TurnError::UpstreamTimeout,
            other => TurnError::Upstream(other.to_string()),
        }
    }
}

/// Position of a turn in its state machine; used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Acquiring,
    Streaming,
    Finalizing,
    Committed,
    Aborted,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Acquiring => "acquiring",
            TurnPhase::Streaming => "streaming",
            TurnPhase::Finalizing => "finalizing",
            TurnPhase::Committed => "committed",
            TurnPhase::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inbound turn request.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: String,
    pub message: String,
    /// Answer as the coach instead of the persona.
    pub is_coaching: bool,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            is_coaching: false,
        }
    }

    pub fn coaching(mut self) -> Self {
        self.is_coaching = true;
        self
    }

    fn validate(&self) -> Result<(), TurnError> {
        if is_blank(&self.session_id) {
            return Err(TurnError::InvalidArgument(
                "sessionId must not be empty".to_string(),
            ));
        }
        if is_blank(&self.message) {
            return Err(TurnError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What a turn pushes to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Next fragment of the reply.
    Chunk(String),
    /// Terminal success; carries the committed reply.
    Done(String),
    /// Terminal failure.
    Failed(String),
}

impl TurnEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnEvent::Chunk(_))
    }
}

/// Use case for streaming conversation turns
pub struct StreamOrchestrator {
    registry: Arc<SessionRegistry>,
    gateway: Arc<dyn GenerationGateway>,
    config: EngineConfig,
    transcript: Arc<dyn TranscriptStore>,
}

impl Clone for StreamOrchestrator {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            transcript: self.transcript.clone(),
        }
    }
}

impl StreamOrchestrator {
    pub fn new(registry: Arc<SessionRegistry>, gateway: Arc<dyn GenerationGateway>) -> Self {
        Self {
            registry,
            gateway,
            config: EngineConfig::default(),
            transcript: Arc::new(NoTranscriptStore),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Mirror committed and aborted turns to a transcript store.
    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.transcript = store;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the request and take the session's stream slot.
    ///
    /// Fails with `InvalidArgument`, `NotFound` or `SessionBusy` before any
    /// provider call. Dropping the returned [`PendingTurn`] without running
    /// it releases the slot.
    pub async fn begin_turn(&self, request: TurnRequest) -> Result<PendingTurn, TurnError> {
        request.validate()?;

        debug!(session_id = %request.session_id, phase = %TurnPhase::Acquiring, "Turn phase");
        let slot = self
            .registry
            .try_acquire_stream(&request.session_id)
            .await?
            .ok_or_else(|| TurnError::SessionBusy(request.session_id.clone()))?;

        Ok(PendingTurn {
            slot,
            request,
            registry: self.registry.clone(),
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            transcript: self.transcript.clone(),
        })
    }

    /// Run a whole turn, relaying chunks into `sink`.
    ///
    /// The sink always receives a terminal [`TurnEvent`] unless the caller
    /// closed it. Returns the committed reply.
    pub async fn open_turn(
        &self,
        request: TurnRequest,
        sink: mpsc::Sender<TurnEvent>,
    ) -> Result<String, TurnError> {
        match self.begin_turn(request).await {
            Ok(turn) => turn.run(sink).await,
            Err(e) => {
                let _ = sink.send(TurnEvent::Failed(e.to_string())).await;
                Err(e)
            }
        }
    }
}

/// A turn that holds its session's stream slot and has not streamed yet.
pub struct PendingTurn {
    slot: StreamSlot,
    request: TurnRequest,
    registry: Arc<SessionRegistry>,
    gateway: Arc<dyn GenerationGateway>,
    config: EngineConfig,
    transcript: Arc<dyn TranscriptStore>,
}

impl PendingTurn {
    pub fn session_id(&self) -> &str {
        self.slot.session_id()
    }

    /// Stream, finalize and release.
    pub async fn run(self, sink: mpsc::Sender<TurnEvent>) -> Result<String, TurnError> {
        let PendingTurn {
            slot,
            request,
            registry,
            gateway,
            config,
            transcript,
        } = self;
        let session_id = slot.session_id().to_string();
        let started = Instant::now();

        info!(
            session_id = %session_id,
            coaching = request.is_coaching,
            "Starting turn: {}",
            truncate_str(&request.message, 80)
        );

        let snapshot = slot.snapshot().await;
        let system_instruction = if request.is_coaching {
            PromptTemplate::coaching_system(snapshot.system_instruction())
        } else {
            snapshot.system_instruction().to_string()
        };
        let generation = GenerationRequest::new(
            system_instruction,
            snapshot.messages().to_vec(),
            request.message.clone(),
        );

        debug!(session_id = %session_id, phase = %TurnPhase::Streaming, "Turn phase");
        let relay = relay_chunks(gateway.as_ref(), generation, &sink);
        let outcome = match config.max_turn_duration {
            Some(limit) => tokio::time::timeout(limit, relay)
                .await
                .unwrap_or(Err(TurnError::UpstreamTimeout)),
            None => relay.await,
        };

        match outcome {
            Ok((reply, chunks)) => {
                debug!(session_id = %session_id, phase = %TurnPhase::Finalizing, "Turn phase");
                let len = registry
                    .commit_turn(&slot, Message::user(&request.message), Message::ai(&reply))
                    .await;
                registry.release_stream(slot);

                info!(
                    session_id = %session_id,
                    phase = %TurnPhase::Committed,
                    chunks,
                    bytes = reply.len(),
                    log_len = len,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Turn committed"
                );
                transcript.record(TranscriptEvent::new(
                    "turn_committed",
                    &session_id,
                    serde_json::json!({
                        "coaching": request.is_coaching,
                        "user": request.message,
                        "ai": reply,
                        "chunks": chunks,
                    }),
                ));

                let _ = sink.send(TurnEvent::Done(reply.clone())).await;
                Ok(reply)
            }
            Err(e) => {
                registry.release_stream(slot);

                warn!(
                    session_id = %session_id,
                    phase = %TurnPhase::Aborted,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Turn aborted: {}",
                    e
                );
                transcript.record(TranscriptEvent::new(
                    "turn_aborted",
                    &session_id,
                    serde_json::json!({
                        "coaching": request.is_coaching,
                        "reason": e.to_string(),
                    }),
                ));

                if e != TurnError::Disconnected {
                    let _ = sink.send(TurnEvent::Failed(e.to_string())).await;
                }
                Err(e)
            }
        }
    }
}

/// Relay provider chunks into the sink until the reply completes.
///
/// Returns the assembled reply and the number of chunks delivered. Stops as
/// soon as the sink is closed, cancelling the provider call. Any early return
/// drops the [`StreamHandle`], which cancels the producer as well.
async fn relay_chunks(
    gateway: &dyn GenerationGateway,
    request: GenerationRequest,
    sink: &mpsc::Sender<TurnEvent>,
) -> Result<(String, usize), TurnError> {
    let mut handle: StreamHandle = tokio::select! {
        _ = sink.closed() => return Err(TurnError::Disconnected),
        handle = gateway.stream_reply(request) => handle?,
    };

    let mut chunks = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = sink.closed() => {
                handle.cancel();
                return Err(TurnError::Disconnected);
            }
            next = handle.next_chunk() => next?,
        };

        let Some(chunk) = next else {
            break;
        };
        chunks += 1;
        if sink.send(TurnEvent::Chunk(chunk)).await.is_err() {
            handle.cancel();
            return Err(TurnError::Disconnected);
        }
    }

    let reply = handle.into_text();
    if reply.trim().is_empty() {
        return Err(TurnError::Upstream("empty reply".to_string()));
    }
    Ok((reply, chunks))
}
