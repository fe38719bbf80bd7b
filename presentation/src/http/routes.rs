//! HTTP API routes.

use super::error::ApiError;
use super::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, Stream};
use parley_application::{TurnEvent, TurnRequest};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Header carrying the authenticated caller, set by the fronting auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Terminal SSE payload of a successful turn.
pub const DONE_EVENT: &str = "[DONE]";

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        // Streaming turns
        .route("/api/chat/stream", post(chat_stream))
        // Analysis
        .route("/api/sessions/:id/feedback", post(session_feedback))
        .route("/api/sessions/:id/suggestion", post(session_suggestion))
        .route("/api/feedback", post(explicit_feedback))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

// ============ Health Check ============

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "parley",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry().len().await,
    }))
}

// ============ Session Lifecycle ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateSessionRequest {
    persona_id: String,
    system_instruction: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let owner_id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?
        .to_string();
    let body = json_body(payload)?;

    let session_id = state
        .registry()
        .create(&owner_id, &body.persona_id, &body.system_instruction)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse { session_id }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let log = state.registry().get(&id).await?;
    Ok(Json(log))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.registry().close(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ Streaming Turns ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChatStreamRequest {
    session_id: String,
    message: String,
    is_coaching: bool,
}

/// Start a turn and stream it as Server-Sent Events.
///
/// Validation, lookup and the busy check happen before the response starts,
/// so those failures get a plain status code. Once streaming, failures arrive
/// as a `{"error": ...}` event. Dropping the response body (client gone)
/// closes the chunk channel, which aborts the turn.
async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatStreamRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let mut request = TurnRequest::new(body.session_id, body.message);
    if body.is_coaching {
        request = request.coaching();
    }

    let pending = state.orchestrator.begin_turn(request).await?;
    let session_id = pending.session_id().to_string();
    let (tx, rx) = mpsc::channel(state.orchestrator.config().chunk_buffer);

    tokio::spawn(async move {
        if let Err(e) = pending.run(tx).await {
            debug!(session_id = %session_id, "Streamed turn ended with error: {}", e);
        }
    });

    Ok(Sse::new(turn_events(rx)).keep_alive(KeepAlive::default()))
}

fn turn_events(
    rx: mpsc::Receiver<TurnEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse_event(event)), rx))
    })
}

fn to_sse_event(event: TurnEvent) -> Event {
    match event {
        TurnEvent::Chunk(content) => {
            Event::default().data(serde_json::json!({ "content": content }).to_string())
        }
        TurnEvent::Done(_) => Event::default().data(DONE_EVENT),
        TurnEvent::Failed(error) => {
            Event::default().data(serde_json::json!({ "error": error }).to_string())
        }
    }
}

// ============ Analysis ============

async fn session_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let feedback = state.analyzer.feedback_for_session(&id).await?;
    Ok(Json(feedback))
}

async fn session_suggestion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = state.analyzer.suggestion_for_session(&id).await?;
    Ok(Json(suggestion))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeedbackRequest {
    user_message: String,
    ai_message: String,
}

async fn explicit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = json_body(payload)?;
    let feedback = state
        .analyzer
        .realtime_feedback(&body.user_message, &body.ai_message)
        .await?;
    Ok(Json(feedback))
}
