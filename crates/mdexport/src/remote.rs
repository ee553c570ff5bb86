//! Client for a running exporter's MCP endpoint.

use std::time::Duration;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::{Value, json};
use ureq::Agent;

use crate::error::CliError;

/// Remote conversions can include diagram rendering on the server side.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Name and description of a conversion tool.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ToolSummary {
    pub(crate) name: String,
    pub(crate) description: String,
}

/// JSON-RPC client for `POST /mcp`.
pub(crate) struct McpClient {
    url: String,
    agent: Agent,
    next_id: u64,
}

impl McpClient {
    /// Create a client for the endpoint at `url`, e.g. `http://localhost:8001/mcp`.
    pub(crate) fn new(url: impl Into<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            url: url.into(),
            agent,
            next_id: 1,
        }
    }

    /// List the tools offered by the server.
    pub(crate) fn list_tools(&mut self) -> Result<Vec<ToolSummary>, CliError> {
        let result = self.request("tools/list", json!({}))?;
        let tools = result["tools"]
            .as_array()
            .ok_or_else(|| CliError::Remote("Malformed tools/list result".to_owned()))?;

        Ok(tools
            .iter()
            .map(|tool| ToolSummary {
                name: tool["name"].as_str().unwrap_or_default().to_owned(),
                description: tool["description"].as_str().unwrap_or_default().to_owned(),
            })
            .collect())
    }

    /// Call a conversion tool with inline Markdown and return the decoded document.
    pub(crate) fn convert(&mut self, tool: &str, content: &str) -> Result<Vec<u8>, CliError> {
        let result = self.request(
            "tools/call",
            json!({ "name": tool, "arguments": { "content": content } }),
        )?;
        decode_tool_result(&result)
    }

    fn request(&mut self, method: &str, params: Value) -> Result<Value, CliError> {
        let id = self.next_id;
        self.next_id += 1;

        tracing::info!(url = %self.url, method, "Sending MCP request");
        let mut response = self
            .agent
            .post(&self.url)
            .send_json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .map_err(|e| CliError::Remote(format!("Request to {} failed: {e}", self.url)))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(CliError::Remote(format!(
                "Server at {} returned HTTP {status}",
                self.url
            )));
        }

        let body: Value = response
            .body_mut()
            .read_json()
            .map_err(|e| CliError::Remote(format!("Invalid response from {}: {e}", self.url)))?;
        unwrap_response(body)
    }
}

/// Extract `result` from a JSON-RPC response or turn `error` into a `CliError`.
fn unwrap_response(mut body: Value) -> Result<Value, CliError> {
    if let Some(error) = body.get("error") {
        let code = error["code"].as_i64().unwrap_or_default();
        let message = error["message"].as_str().unwrap_or("unknown error");
        return Err(CliError::Remote(format!("{message} (code {code})")));
    }
    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(CliError::Remote(
            "Response has neither result nor error".to_owned(),
        )),
    }
}

/// Decode the `data` part of a `tools/call` result.
fn decode_tool_result(result: &Value) -> Result<Vec<u8>, CliError> {
    let parts = result["content"]
        .as_array()
        .ok_or_else(|| CliError::Remote("Malformed tools/call result".to_owned()))?;

    if result["isError"].as_bool().unwrap_or(false) {
        let message = parts
            .iter()
            .find_map(|part| part["text"].as_str())
            .unwrap_or("conversion failed");
        return Err(CliError::Conversion(message.to_owned()));
    }

    let data = parts
        .iter()
        .find(|part| part["type"] == "data")
        .and_then(|part| part["data"].as_str())
        .ok_or_else(|| CliError::Remote("Result carries no document data".to_owned()))?;

    BASE64_STANDARD
        .decode(data)
        .map_err(|e| CliError::Remote(format!("Invalid base64 payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Answer one request with a JSON body, returning the received request body.
    fn serve_once(body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':')
                    && name.eq_ignore_ascii_case("content-length")
                {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request = vec![0; content_length];
            reader.read_exact(&mut request).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            String::from_utf8(request).unwrap()
        });

        (url, handle)
    }

    #[test]
    fn test_convert_decodes_data_part() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"content": [
                {"type": "text", "text": "Successfully converted markdown to PDF (4 bytes)"},
                {"type": "data", "mimeType": "application/pdf", "data": "JVBERg=="}
            ]}
        });
        let (url, handle) = serve_once(response.to_string());

        let bytes = McpClient::new(url)
            .convert("convert_markdown_to_pdf", "# Title")
            .unwrap();

        assert_eq!(bytes, b"%PDF");
        let request: Value = serde_json::from_str(&handle.join().unwrap()).unwrap();
        assert_eq!(request["method"], "tools/call");
        assert_eq!(request["params"]["name"], "convert_markdown_to_pdf");
        assert_eq!(request["params"]["arguments"]["content"], "# Title");
    }

    #[test]
    fn test_list_tools() {
        let response = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"tools": [
                {"name": "convert_markdown_to_html", "description": "Convert to HTML"}
            ]}
        });
        let (url, handle) = serve_once(response.to_string());

        let tools = McpClient::new(url).list_tools().unwrap();

        assert_eq!(
            tools,
            vec![ToolSummary {
                name: "convert_markdown_to_html".to_owned(),
                description: "Convert to HTML".to_owned(),
            }]
        );
        handle.join().unwrap();
    }

    #[test]
    fn test_error_response() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method 'x' not found"}
        });
        let err = unwrap_response(body).unwrap_err();
        assert_eq!(err.to_string(), "Method 'x' not found (code -32601)");
    }

    #[test]
    fn test_tool_error_result() {
        let result = json!({
            "content": [{"type": "text", "text": "Error converting markdown to PDF: boom"}],
            "isError": true
        });
        let err = decode_tool_result(&result).unwrap_err();
        assert!(matches!(err, CliError::Conversion(_)));
        assert_eq!(err.to_string(), "Error converting markdown to PDF: boom");
    }

    #[test]
    fn test_missing_data_part() {
        let result = json!({"content": [{"type": "text", "text": "ok"}]});
        assert!(decode_tool_result(&result).is_err());
    }

    #[test]
    fn test_unreachable_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/mcp", listener.local_addr().unwrap());
        drop(listener);

        let err = McpClient::new(url).list_tools().unwrap_err();
        assert!(matches!(err, CliError::Remote(_)));
    }
}
