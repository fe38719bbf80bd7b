//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_application::{AnalysisError, SessionError, TurnError};
use serde::Serialize;

/// Errors returned by API handlers, one variant per status class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized(String),
    InvalidRequest(String),
    NotFound(String),
    SessionBusy(String),
    UpstreamTimeout(String),
    Unavailable(String),
    Upstream(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SessionBusy(_) => StatusCode::CONFLICT,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidRequest(_) => "INVALID_ARGUMENT",
            ApiError::NotFound(_) => "SESSION_NOT_FOUND",
            ApiError::SessionBusy(_) => "SESSION_BUSY",
            ApiError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            ApiError::Unavailable(_) => "ANALYSIS_UNAVAILABLE",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::InvalidRequest(m)
            | ApiError::NotFound(m)
            | ApiError::SessionBusy(m)
            | ApiError::UpstreamTimeout(m)
            | ApiError::Unavailable(m)
            | ApiError::Upstream(m) => m,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::InvalidArgument(_) => ApiError::InvalidRequest(message),
            SessionError::NotFound(_) => ApiError::NotFound(message),
            SessionError::Busy(_) => ApiError::SessionBusy(message),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        let message = e.to_string();
        match e {
            TurnError::InvalidArgument(_) => ApiError::InvalidRequest(message),
            TurnError::NotFound(_) => ApiError::NotFound(message),
            TurnError::SessionBusy(_) => ApiError::SessionBusy(message),
            TurnError::UpstreamTimeout => ApiError::UpstreamTimeout(message),
            TurnError::Upstream(_) | TurnError::Disconnected => ApiError::Upstream(message),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        let message = e.to_string();
        match e {
            AnalysisError::InvalidArgument(_) => ApiError::InvalidRequest(message),
            AnalysisError::NotFound(_) => ApiError::NotFound(message),
            AnalysisError::Unavailable(_) => ApiError::Unavailable(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::warn!(code = self.code(), "{}", self.message());
        }

        let body = serde_json::json!({
            "error": ErrorBody {
                code: self.code(),
                message: self.message(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
