//! Health and discovery endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;
use crate::tools::Tool;

/// Service name reported by `/health/`.
const SERVICE_NAME: &str = "mdexport";

const ENDPOINTS: [&str; 6] = [
    "GET /convert/ - Convert to Word (supports content or file_path)",
    "GET /convert-pdf/ - Convert to PDF (supports content or file_path)",
    "GET /convert-html/ - Convert to HTML (supports content or file_path)",
    "POST /mcp - MCP JSON-RPC endpoint",
    "GET /health/ - Health check",
    "GET /tools/ - List available tools",
];

/// Response for GET /health/.
#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: String,
    conversion_available: bool,
}

/// Response for GET /tools/.
#[derive(Serialize)]
pub(crate) struct ToolsResponse {
    tools: Vec<&'static str>,
    endpoints: Vec<&'static str>,
}

/// Handle GET /health/.
pub(crate) async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: state.version.clone(),
        conversion_available: true,
    })
}

/// Handle GET /tools/.
pub(crate) async fn get_tools() -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: Tool::ALL.iter().map(|tool| tool.name()).collect(),
        endpoints: ENDPOINTS.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tools_response_serialization() {
        let response = ToolsResponse {
            tools: vec!["convert_markdown_to_word"],
            endpoints: vec!["GET /health/ - Health check"],
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["tools"][0], "convert_markdown_to_word");
        assert_eq!(json["endpoints"][0], "GET /health/ - Health check");
    }
}
