//! Credit scoring server
//!
//! HTTP endpoints for business record lookup, credit scoring, credit record
//! submission and the business credit chat.

pub mod conversation;
pub mod demo;
pub mod http;
pub mod metrics;
pub mod state;

pub use conversation::{conversation_key, Conversation, ConversationStore};
pub use http::create_router;
pub use metrics::{init_metrics, record_chat, record_llm_latency, record_request, record_score};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use creditai_llm::LlmError;
use creditai_persistence::StoreError;

/// Body of every 404 caused by a missing GST_IN row
pub const NOT_FOUND_MESSAGE: &str = "No data found for the provided GST_IN";

/// Body of every 400 caused by a missing `gst_in` parameter
pub const MISSING_GST_MESSAGE: &str = "GST_IN parameter is required";

/// Server errors
///
/// The display text is the client-facing message.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Database or AI service failure
    #[error("{0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = StatusCode::from(self);
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServerError::NotFound(NOT_FOUND_MESSAGE.to_string()),
            StoreError::InvalidTable(_) | StoreError::Configuration(_) => {
                ServerError::Internal(err.to_string())
            },
            other => ServerError::Dependency(format!("Database error: {}", other)),
        }
    }
}

impl From<LlmError> for ServerError {
    fn from(err: LlmError) -> Self {
        ServerError::Dependency(format!("AI service error: {}", err))
    }
}
