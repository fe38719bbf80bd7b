//! Generation Gateway port
//!
//! Defines the interface for communicating with the upstream text-generation
//! provider: one chunked-streaming call and one single-shot call.

use async_trait::async_trait;
use parley_domain::{Message, StreamEvent};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during gateway operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout)
    }
}

/// Everything the provider needs to produce the next AI message.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Opaque prompt context (persona instruction or coaching framing).
    pub system_instruction: String,
    /// Committed messages preceding this turn, oldest first.
    pub history: Vec<Message>,
    /// The new user message being answered.
    pub user_text: String,
}

impl GenerationRequest {
    pub fn new(
        system_instruction: impl Into<String>,
        history: Vec<Message>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history,
            user_text: user_text.into(),
        }
    }
}

/// One in-flight streaming generation call.
///
/// Wraps the `mpsc::Receiver<StreamEvent>` fed by the adapter together with
/// the accumulated text, a cancellation token shared with the producer, and
/// the start timestamp. Dropping the handle cancels the producer.
pub struct StreamHandle {
    receiver: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    started_at: Instant,
    buffer: String,
    finished: bool,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>, cancel: CancellationToken) -> Self {
        Self {
            receiver,
            cancel,
            started_at: Instant::now(),
            buffer: String::new(),
            finished: false,
        }
    }

    /// Request cancellation of the upstream call. Best-effort: the producer
    /// observes the token at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Receive the next chunk.
    ///
    /// Returns `Ok(Some(chunk))` for each non-empty fragment in receipt order,
    /// `Ok(None)` once the stream completed normally, and an error when the
    /// provider failed, timed out, or went away without a terminal event.
    ///
    /// A provider that only reports the final text (no deltas) has that text
    /// surfaced as a single chunk, so the delivered chunks always concatenate
    /// to [`text`](Self::text). Cancel-safe.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, GatewayError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let Some(event) = self.receiver.recv().await else {
                self.finished = true;
                return Err(GatewayError::TransportClosed);
            };

            match event {
                StreamEvent::Delta(chunk) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    self.buffer.push_str(&chunk);
                    return Ok(Some(chunk));
                }
                StreamEvent::Completed(text) => {
                    self.finished = true;
                    if self.buffer.is_empty() && !text.is_empty() {
                        self.buffer.push_str(&text);
                        return Ok(Some(text));
                    }
                    return Ok(None);
                }
                StreamEvent::Error(e) => {
                    self.finished = true;
                    return Err(GatewayError::RequestFailed(e));
                }
                StreamEvent::TimedOut => {
                    self.finished = true;
                    return Err(GatewayError::Timeout);
                }
            }
        }
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, GatewayError> {
        while self.next_chunk().await?.is_some() {}
        Ok(self.into_text())
    }

    /// Take the accumulated text.
    pub fn into_text(mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Gateway to the upstream generation provider
///
/// This port defines how the application layer talks to text-generation
/// providers. Implementations (adapters) live in the infrastructure layer.
/// Streaming and single-shot calls are independent: an in-flight stream
/// never blocks a single-shot call.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Start a streaming reply.
    ///
    /// Chunks arrive on the returned handle in receipt order.
    async fn stream_reply(&self, request: GenerationRequest)
    -> Result<StreamHandle, GatewayError>;

    /// Send a single prompt and wait for the full reply.
    ///
    /// Default implementation drives [`stream_reply`](Self::stream_reply) to
    /// completion with no system instruction or history.
    async fn complete_once(&self, prompt: &str) -> Result<String, GatewayError> {
        let handle = self
            .stream_reply(GenerationRequest::new("", Vec::new(), prompt))
            .await?;
        handle.collect_text().await
    }
}
