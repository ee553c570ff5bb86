//! `mdexport serve` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use mdexport_config::{CliSettings, Config};
use mdexport_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover mdexport.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for converted files (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Kroki server URL for diagram rendering (overrides config).
    #[arg(long)]
    kroki_url: Option<String>,

    /// Disable Mermaid diagram rendering.
    #[arg(long)]
    no_mermaid: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Configuration file given on the command line.
    pub(crate) fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            output_dir: self.output_dir,
            enable_mermaid: self.no_mermaid.then_some(false),
            kroki_url: self.kroki_url,
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        std::fs::create_dir_all(&config.paths.output_dir)?;

        output.highlight("Markdown Exporter");
        output.separator();
        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "MCP endpoint: http://{}:{}/mcp",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Output directory: {}",
            config.paths.output_dir.display()
        ));

        if !config.conversion.enable_mermaid {
            output.info("Diagram rendering: disabled");
        } else if let Some(kroki_url) = &config.diagrams_resolved.kroki_url {
            output.info(&format!("Diagram rendering: Kroki at {kroki_url}"));
        } else {
            output.info("Diagram rendering: mmdc");
        }

        if config.header_footer_resolved.is_some() {
            output.info("Header/footer: enabled");
        }

        let server_config = server_config_from_config(&config, version.to_owned())?;
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
