//! REST conversion endpoints.
//!
//! `GET /convert/`, `GET /convert-pdf/` and `GET /convert-html/` take
//! `content` or `file_path` as query parameters and return the converted
//! document base64-encoded.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Serialize;

use crate::error::ServerError;
use crate::state::AppState;
use crate::tools::{InputSource, Tool, ToolInput, ToolOutput};

/// Response for the conversion endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct ConvertResponse {
    success: bool,
    message: String,
    /// Base64-encoded document.
    data: String,
    mime_type: &'static str,
    source: InputSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<String>,
}

impl From<ToolOutput> for ConvertResponse {
    fn from(output: ToolOutput) -> Self {
        Self {
            success: true,
            message: format!(
                "Markdown converted to {} successfully ({} bytes)",
                output.format.label(),
                output.bytes.len()
            ),
            data: BASE64_STANDARD.encode(&output.bytes),
            mime_type: output.format.mime_type(),
            source: output.source,
            saved_to: output.saved_to.map(|p| p.display().to_string()),
        }
    }
}

/// Handle GET /convert/.
pub(crate) async fn convert_word(
    State(state): State<Arc<AppState>>,
    Query(input): Query<ToolInput>,
) -> Result<Json<ConvertResponse>, ServerError> {
    run(&state, Tool::Word, input).await
}

/// Handle GET /convert-pdf/.
pub(crate) async fn convert_pdf(
    State(state): State<Arc<AppState>>,
    Query(input): Query<ToolInput>,
) -> Result<Json<ConvertResponse>, ServerError> {
    run(&state, Tool::Pdf, input).await
}

/// Handle GET /convert-html/.
pub(crate) async fn convert_html(
    State(state): State<Arc<AppState>>,
    Query(input): Query<ToolInput>,
) -> Result<Json<ConvertResponse>, ServerError> {
    run(&state, Tool::Html, input).await
}

async fn run(
    state: &AppState,
    tool: Tool,
    input: ToolInput,
) -> Result<Json<ConvertResponse>, ServerError> {
    let registry = Arc::clone(&state.registry);
    let output = tokio::task::spawn_blocking(move || registry.run(tool, &input)).await??;
    Ok(Json(output.into()))
}
