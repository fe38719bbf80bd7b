//! HTTP API
//!
//! axum router exposing session lifecycle, the SSE turn stream and analysis.

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::{DONE_EVENT, USER_ID_HEADER, build_router};
pub use state::AppState;
