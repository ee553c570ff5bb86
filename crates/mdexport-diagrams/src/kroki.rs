//! Mermaid rendering through a Kroki server.
//!
//! Sends the diagram source as `text/plain` to `{server}/mermaid/png` and
//! writes the response body to `diagram_xxxxxxxx.png`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdexport_renderer::DiagramRenderer;
use ureq::Agent;
use uuid::Uuid;

use crate::consts::DEFAULT_TIMEOUT;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Error from a single Kroki request.
#[derive(Debug, thiserror::Error)]
pub enum KrokiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid PNG data")]
    InvalidPng,
}

/// Create an HTTP agent with the given timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Diagram renderer backed by a Kroki HTTP service.
#[derive(Clone)]
pub struct KrokiRenderer {
    server_url: String,
    agent: Agent,
}

impl KrokiRenderer {
    /// Create a renderer for the Kroki instance at `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            server_url: server_url.trim_end_matches('/').to_owned(),
            agent: create_agent(DEFAULT_TIMEOUT),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    /// Server base URL without a trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Render `source` to a PNG inside `output_dir`.
    pub fn try_render(&self, source: &str, output_dir: &Path) -> Result<PathBuf, KrokiError> {
        let url = format!("{}/mermaid/png", self.server_url);
        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(source.as_bytes())
            .map_err(|e| KrokiError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(KrokiError::Http(format!("HTTP {status}: {error_body}")));
        }

        let data = body
            .read_to_vec()
            .map_err(|e| KrokiError::Http(e.to_string()))?;
        if !data.starts_with(PNG_SIGNATURE) {
            return Err(KrokiError::InvalidPng);
        }

        let id = Uuid::new_v4().simple().to_string();
        let path = output_dir.join(format!("diagram_{}.png", &id[..8]));
        std::fs::write(&path, &data)?;
        Ok(path)
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn render(&self, source: &str, output_dir: &Path) -> Option<PathBuf> {
        match self.try_render(source, output_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(server = %self.server_url, error = %e, "Kroki rendering failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serve one request with `status` and `body`, returning the request line and body.
    fn serve_once(status: &str, body: &'static [u8]) -> (String, JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let status = status.to_owned();

        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

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
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
            stream.flush().unwrap();

            (
                request_line.trim().to_owned(),
                String::from_utf8(request_body).unwrap(),
            )
        });

        (url, handle)
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let renderer = KrokiRenderer::new("https://kroki.io/");
        assert_eq!(renderer.server_url(), "https://kroki.io");
    }

    #[test]
    fn test_successful_render() {
        let (url, handle) = serve_once("200 OK", b"\x89PNG\r\n\x1a\nrest");
        let dir = tempfile::tempdir().unwrap();

        let path = KrokiRenderer::new(url)
            .render("graph TD\n    A-->B", dir.path())
            .unwrap();

        let (request_line, request_body) = handle.join().unwrap();
        assert_eq!(request_line, "POST /mermaid/png HTTP/1.1");
        assert_eq!(request_body, "graph TD\n    A-->B");
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\nrest");
    }

    #[test]
    fn test_http_error_returns_none() {
        let (url, handle) = serve_once("400 Bad Request", b"Syntax error");
        let dir = tempfile::tempdir().unwrap();

        let result = KrokiRenderer::new(url).try_render("graph", dir.path());
        handle.join().unwrap();

        match result {
            Err(KrokiError::Http(message)) => assert_eq!(message, "HTTP 400: Syntax error"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_png_body_rejected() {
        let (url, handle) = serve_once("200 OK", b"<svg/>");
        let dir = tempfile::tempdir().unwrap();

        let result = KrokiRenderer::new(url).try_render("graph", dir.path());
        handle.join().unwrap();

        assert!(matches!(result, Err(KrokiError::InvalidPng)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreachable_server_returns_none() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let dir = tempfile::tempdir().unwrap();

        let renderer = KrokiRenderer::new(url).with_timeout(Duration::from_secs(2));
        assert!(renderer.render("graph TD", dir.path()).is_none());
    }
}
