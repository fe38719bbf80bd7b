//! Chat Completions wire types
//!
//! Only the fields this adapter reads or writes are modelled; everything else
//! in provider payloads is ignored.

use parley_application::GenerationRequest;
use parley_domain::Sender;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Build the message list: system instruction, history, then the new user text.
pub fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if !request.system_instruction.trim().is_empty() {
        messages.push(ChatMessage::new("system", &request.system_instruction));
    }
    for message in &request.history {
        let role = match message.sender {
            Sender::User => "user",
            Sender::Ai => "assistant",
        };
        messages.push(ChatMessage::new(role, &message.text));
    }
    messages.push(ChatMessage::new("user", &request.user_text));
    messages
}

/// One `data:` payload of a streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// `{"error": {...}}` envelope used for non-2xx bodies and in-stream failures.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// What a single stream payload contributes.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Text fragment (possibly empty for role-only or keep-alive chunks).
    Delta(String),
    /// The choice finished; more `data:` lines may still follow before `[DONE]`.
    Finished(String),
}

/// Interpret one `data:` payload.
pub fn parse_chunk(data: &str) -> Result<ChunkOutcome, super::ProviderError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Err(super::ProviderError::Api(error.message));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(ChunkOutcome::Delta(String::new()));
    };
    let text = choice.delta.content.unwrap_or_default();
    match choice.finish_reason {
        Some(_) => Ok(ChunkOutcome::Finished(text)),
        None => Ok(ChunkOutcome::Delta(text)),
    }
}

/// Best-effort message from an error body; falls back to the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.kind {
            Some(kind) => format!("{} ({})", envelope.error.message, kind),
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_domain::Message;

    #[test]
    fn test_build_messages_orders_system_history_user() {
        let request = GenerationRequest::new(
            "You are a barista.",
            vec![Message::user("hi"), Message::ai("hello!")],
            "one latte please",
        );

        let messages = build_messages(&request);
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[3].content, "one latte please");
    }

    #[test]
    fn test_build_messages_skips_blank_system() {
        let request = GenerationRequest::new("", Vec::new(), "prompt");
        let messages = build_messages(&request);
        assert_eq!(messages, vec![ChatMessage::new("user", "prompt")]);
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "gpt-4.1-mini".to_string(),
            messages: vec![ChatMessage::new("user", "hi")],
            stream: true,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_parse_chunk_variants() {
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{"content":"he"}}]}"#).unwrap(),
            ChunkOutcome::Delta("he".to_string())
        );
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            ChunkOutcome::Delta(String::new())
        );
        assert_eq!(
            parse_chunk(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap(),
            ChunkOutcome::Finished(String::new())
        );
        assert_eq!(
            parse_chunk(r#"{"choices":[]}"#).unwrap(),
            ChunkOutcome::Delta(String::new())
        );
    }

    #[test]
    fn test_parse_chunk_error_payload() {
        let err = parse_chunk(r#"{"error":{"message":"overloaded"}}"#).unwrap_err();
        assert_eq!(err.to_string(), "Provider error: overloaded");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#),
            "bad key (invalid_request_error)"
        );
        assert_eq!(error_message("  gateway down \n"), "gateway down");
    }
}
