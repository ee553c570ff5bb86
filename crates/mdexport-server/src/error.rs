//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::tools::ToolError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Tool rejected its input or failed to convert.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Blocking conversion task panicked or was cancelled.
    #[error("Conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Tool(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            Self::Tool(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, axum::Json(json!({"error": self.to_string()}))).into_response()
    }
}
