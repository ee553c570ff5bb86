//! HTTP server for the Markdown exporter.
//!
//! This crate exposes the three conversion tools over two surfaces:
//! - `POST /mcp`: Model Context Protocol (JSON-RPC 2.0) endpoint
//! - `GET /convert/`, `/convert-pdf/`, `/convert-html/`: REST endpoints
//!
//! plus `GET /health/` and `GET /tools/` for discovery.
//!
//! # Quick Start
//!
//! ```ignore
//! use mdexport_renderer::Converter;
//! use mdexport_server::{ServerConfig, ToolRegistry, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_string(),
//!         port: 8001,
//!         version: "0.1.0".to_string(),
//!         registry: ToolRegistry::new(Converter::new()).with_output_dir("results"),
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Client ──HTTP──► axum server (mdexport-server)
//!                        │
//!                        ├─► /mcp (JSON-RPC dispatch)
//!                        │       │
//!                        │       └─► ToolRegistry ──► Converter (blocking pool)
//!                        │
//!                        └─► REST handlers ──► ToolRegistry
//! ```

mod app;
mod error;
mod handlers;
pub mod mcp;
mod state;
mod tools;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use mdexport_config::{Config, ConfigError};
use state::AppState;

pub use error::ServerError;
pub use tools::{
    InputSource, Tool, ToolError, ToolInput, ToolOutput, ToolRegistry, converter_from_config,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Application version reported to clients.
    pub version: String,
    /// Conversion tools served by both surfaces.
    pub registry: ToolRegistry,
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        registry: Arc::new(config.registry),
        version: config.version,
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from exporter config.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `version` - Application version
///
/// # Errors
///
/// Returns an error if `security.max_file_size` is malformed.
pub fn server_config_from_config(
    config: &Config,
    version: String,
) -> Result<ServerConfig, ConfigError> {
    Ok(ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        version,
        registry: ToolRegistry::from_config(config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_config_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.host = "0.0.0.0".to_owned();
        config.server.port = 9100;
        config.paths.output_dir = dir.path().join("out");

        let server = server_config_from_config(&config, "1.2.3".to_owned()).unwrap();

        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 9100);
        assert_eq!(server.version, "1.2.3");
    }

    #[test]
    fn test_server_config_rejects_bad_size() {
        let mut config = Config::default();
        config.security.max_file_size = "lots".to_owned();

        assert!(server_config_from_config(&config, "1.0.0".to_owned()).is_err());
    }
}
