//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::mcp;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    let rest_routes = Router::new()
        .route("/convert/", get(handlers::convert::convert_word))
        .route("/convert-pdf/", get(handlers::convert::convert_pdf))
        .route("/convert-html/", get(handlers::convert::convert_html))
        .route("/health/", get(handlers::health::get_health))
        .route("/tools/", get(handlers::health::get_tools));

    let mcp_routes =
        Router::new().route("/mcp", get(mcp::handle_get).post(mcp::handle_post));

    Router::new()
        .merge(rest_routes)
        .merge(mcp_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use mdexport_renderer::Converter;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::tools::ToolRegistry;

    fn router() -> Router {
        let state = Arc::new(AppState {
            registry: Arc::new(ToolRegistry::new(Converter::new())),
            version: "0.1.0".to_owned(),
        });
        create_router(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn post_mcp(body: &str) -> (StatusCode, Option<Value>) {
        let response = router()
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_owned()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = (!bytes.is_empty()).then(|| serde_json::from_slice(&bytes).unwrap());
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get("/health/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["conversion_available"], true);
    }

    #[tokio::test]
    async fn test_tools_listing() {
        let (status, json) = get("/tools/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["tools"],
            json!([
                "convert_markdown_to_word",
                "convert_markdown_to_pdf",
                "convert_markdown_to_html"
            ])
        );
    }

    #[tokio::test]
    async fn test_convert_html_from_content() {
        let (status, json) = get("/convert-html/?content=%23%20Title").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["mime_type"], "text/html");
        assert_eq!(json["source"], "content");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with("Markdown converted to HTML successfully (")
        );
    }

    #[tokio::test]
    async fn test_convert_without_input_is_bad_request() {
        let (status, json) = get("/convert/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"],
            "Either 'content' or 'file_path' must be provided"
        );
    }

    #[tokio::test]
    async fn test_mcp_initialize() {
        let (status, json) =
            post_mcp(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        let json = json.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], 1);
        assert_eq!(json["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(json["result"]["serverInfo"]["name"], "markdown-exporter-mcp");
    }

    #[tokio::test]
    async fn test_mcp_tools_list() {
        let (_, json) = post_mcp(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let tools = json.unwrap()["result"]["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 3);
    }

    #[tokio::test]
    async fn test_mcp_tools_call_pdf() {
        let (_, json) = post_mcp(
            r##"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"convert_markdown_to_pdf","arguments":{"content":"# Report"}}}"##,
        )
        .await;
        let json = json.unwrap();
        let content = json["result"]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "data");
        assert_eq!(content[1]["mimeType"], "application/pdf");
        assert!(content[1]["data"].as_str().unwrap().starts_with("JVBERi0"));
    }

    #[tokio::test]
    async fn test_mcp_unknown_method() {
        let (_, json) = post_mcp(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#).await;
        let json = json.unwrap();
        assert_eq!(json["error"]["code"], -32601);
        assert_eq!(json["error"]["message"], "Method 'resources/list' not found");
    }

    #[tokio::test]
    async fn test_mcp_unknown_tool() {
        let (_, json) = post_mcp(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"get_summary","arguments":{}}}"#,
        )
        .await;
        assert_eq!(json.unwrap()["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_mcp_missing_input() {
        let (_, json) = post_mcp(
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"convert_markdown_to_word","arguments":{}}}"#,
        )
        .await;
        let json = json.unwrap();
        assert_eq!(json["error"]["code"], -32602);
        assert_eq!(
            json["error"]["message"],
            "Either 'content' or 'file_path' must be provided"
        );
    }

    #[tokio::test]
    async fn test_mcp_parse_error() {
        let (_, json) = post_mcp("{not json").await;
        let json = json.unwrap();
        assert_eq!(json["error"]["code"], -32700);
        assert_eq!(json["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_mcp_notification_accepted() {
        let (status, json) =
            post_mcp(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(json.is_none());
    }

    #[tokio::test]
    async fn test_mcp_get() {
        let (status, json) = get("/mcp").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "MCP server is running");
    }
}
