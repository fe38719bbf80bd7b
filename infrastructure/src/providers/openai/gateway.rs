//! OpenAI-compatible generation gateway
//!
//! Streams replies from `POST {base_url}/v1/chat/completions` with
//! `stream: true`. Each call gets its own reader task which decodes SSE frames
//! into [`StreamEvent`]s and stops as soon as the caller cancels.

use super::error::{ProviderError, Result};
use super::protocol::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChunkOutcome, build_messages,
    error_message, parse_chunk,
};
use super::sse::{DONE_SENTINEL, SseDecoder};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use parley_application::{GatewayError, GenerationGateway, GenerationRequest, StreamHandle};
use parley_domain::StreamEvent;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const EVENT_BUFFER: usize = 64;

/// Connection settings for [`OpenAiGateway`].
#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model for conversation turns.
    pub model: String,
    /// Model for single-shot analysis calls; falls back to `model`.
    pub analysis_model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Limit for receiving response headers (and whole single-shot calls).
    pub request_timeout: Duration,
    /// Longest silence tolerated between two stream chunks.
    pub chunk_timeout: Duration,
}

impl Default for OpenAiGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            analysis_model: None,
            max_tokens: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            chunk_timeout: Duration::from_secs(DEFAULT_CHUNK_TIMEOUT_SECS),
        }
    }
}

impl OpenAiGatewayConfig {
    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn analysis_model(&self) -> &str {
        self.analysis_model.as_deref().unwrap_or(&self.model)
    }
}

/// Generation gateway for any server speaking the Chat Completions API
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> std::result::Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;

        info!(
            endpoint = %config.endpoint(),
            model = %config.model,
            "OpenAiGateway initialized"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiGatewayConfig {
        &self.config
    }

    fn post(&self, body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let mut request = self.client.post(self.config.endpoint()).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        request
    }

    /// Send a request and wait for response headers, mapping non-2xx to errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = tokio::time::timeout(self.config.request_timeout, request.send())
            .await
            .map_err(|_| ProviderError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatCompletionRequest {
            model: self.config.analysis_model().to_string(),
            messages: vec![ChatMessage::new("user", prompt)],
            stream: false,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .send(self.post(&body).timeout(self.config.request_timeout))
            .await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl GenerationGateway for OpenAiGateway {
    async fn stream_reply(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<StreamHandle, GatewayError> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(&request),
            stream: true,
            max_tokens: self.config.max_tokens,
        };
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            "Opening completion stream"
        );

        let response = self
            .send(self.post(&body).header("Accept", "text/event-stream"))
            .await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        tokio::spawn(pump_events(
            response.bytes_stream(),
            tx,
            cancel.clone(),
            self.config.chunk_timeout,
        ));

        Ok(StreamHandle::new(rx, cancel))
    }

    async fn complete_once(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
        debug!(model = %self.config.analysis_model(), "Single-shot completion");
        self.complete(prompt).await.map_err(GatewayError::from)
    }
}

/// Decode an SSE byte stream into [`StreamEvent`]s.
///
/// Emits zero or more `Delta`s and then exactly one terminal event, unless
/// the token is cancelled or the receiver goes away first.
pub(crate) async fn pump_events<S, B, E>(
    mut stream: S,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    chunk_timeout: Duration,
) where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut decoder = SseDecoder::new();
    let mut text = String::new();
    let mut finished = false;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Completion stream cancelled");
                return;
            }
            next = tokio::time::timeout(chunk_timeout, stream.next()) => next,
        };

        let payloads = match next {
            Err(_) => {
                warn!(timeout_secs = chunk_timeout.as_secs(), "No chunk within idle window");
                let _ = tx.send(StreamEvent::TimedOut).await;
                return;
            }
            Ok(Some(Err(e))) => {
                warn!("Completion stream error: {}", e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
            Ok(Some(Ok(bytes))) => decoder.push(bytes.as_ref()),
            Ok(None) => {
                // Servers that close without the sentinel still count as done
                // once a choice has finished.
                let tail = decoder.finish();
                let terminal = match tail {
                    Some(data) if data.trim() == DONE_SENTINEL => StreamEvent::Completed(text),
                    _ if finished => StreamEvent::Completed(text),
                    _ => StreamEvent::Error(ProviderError::Truncated.to_string()),
                };
                let _ = tx.send(terminal).await;
                return;
            }
        };

        for data in payloads {
            if data.trim() == DONE_SENTINEL {
                let _ = tx.send(StreamEvent::Completed(text)).await;
                return;
            }

            let fragment = match parse_chunk(&data) {
                Ok(ChunkOutcome::Delta(fragment)) => fragment,
                Ok(ChunkOutcome::Finished(fragment)) => {
                    finished = true;
                    fragment
                }
                Err(e) => {
                    warn!("Bad stream payload: {}", e);
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return;
                }
            };

            if fragment.is_empty() {
                continue;
            }
            text.push_str(&fragment);
            if tx.send(StreamEvent::Delta(fragment)).await.is_err() {
                debug!("Stream receiver dropped");
                return;
            }
        }
    }
}
