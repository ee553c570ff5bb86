//! Model Context Protocol endpoint.
//!
//! A single `POST /mcp` route accepts JSON-RPC 2.0 requests and supports
//! `initialize`, `tools/list`, `tools/call` and `ping`. Notifications are
//! acknowledged with `202 Accepted` and no body.
//!
//! Protocol version 2024-11-05.

pub mod protocol;

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::state::AppState;
use crate::tools::{Tool, ToolInput, ToolOutput, ToolRegistry};
use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION, PARSE_ERROR, SERVER_NAME,
};

/// Number of characters of HTML returned as a preview.
const HTML_PREVIEW_CHARS: usize = 500;

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: ToolInput,
}

/// Handle POST /mcp.
pub(crate) async fn handle_post(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed MCP request");
            let error = JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}"));
            return Json(JsonRpcResponse::failure(Value::Null, error)).into_response();
        }
    };

    tracing::info!(method = %request.method, "Received MCP request");

    if request.is_notification() {
        return StatusCode::ACCEPTED.into_response();
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match dispatch(&state, request).await {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => {
            tracing::warn!(code = error.code, message = %error.message, "MCP request failed");
            JsonRpcResponse::failure(id, error)
        }
    };
    Json(response).into_response()
}

/// Handle GET /mcp.
pub(crate) async fn handle_get() -> Json<Value> {
    let tools: Vec<&str> = Tool::ALL.iter().map(|tool| tool.name()).collect();
    Json(json!({
        "message": "MCP server is running",
        "tools": tools,
    }))
}

async fn dispatch(state: &AppState, request: JsonRpcRequest) -> Result<Value, JsonRpcError> {
    match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": state.version,
            }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": ToolRegistry::definitions() })),
        "tools/call" => call_tool(state, request.params).await,
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

async fn call_tool(state: &AppState, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    let params: CallParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))?;
    let tool =
        Tool::from_name(&params.name).ok_or_else(|| JsonRpcError::method_not_found(&params.name))?;

    let registry = Arc::clone(&state.registry);
    let input = params.arguments;
    let result = tokio::task::spawn_blocking(move || registry.run(tool, &input))
        .await
        .map_err(JsonRpcError::internal)?;

    match result {
        Ok(output) => Ok(tool_result(&output)),
        Err(e) if e.is_invalid_input() => Err(JsonRpcError::invalid_params(e.to_string())),
        Err(e) => {
            tracing::error!(tool = tool.name(), error = %e, "Tool failed");
            Ok(json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true,
            }))
        }
    }
}

/// Build the `tools/call` result for a successful conversion.
fn tool_result(output: &ToolOutput) -> Value {
    let label = output.format.label();
    let size = output.bytes.len();
    let summary = match &output.saved_to {
        Some(path) => format!(
            "Successfully converted markdown to {label} and saved to {} ({size} bytes)",
            path.display()
        ),
        None => format!("Successfully converted markdown to {label} ({size} bytes)"),
    };

    let mut content = vec![json!({ "type": "text", "text": summary })];
    if output.format == mdexport_renderer::OutputFormat::Html {
        content.push(json!({ "type": "text", "text": html_preview(&output.bytes) }));
    }
    content.push(json!({
        "type": "data",
        "mimeType": output.format.mime_type(),
        "data": BASE64_STANDARD.encode(&output.bytes),
    }));

    json!({ "content": content })
}

/// First characters of an HTML document, with `...` when truncated.
fn html_preview(bytes: &[u8]) -> String {
    let html = String::from_utf8_lossy(bytes);
    let mut chars = html.chars();
    let mut preview: String = chars.by_ref().take(HTML_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        preview.push_str("...");
    }
    preview
}
