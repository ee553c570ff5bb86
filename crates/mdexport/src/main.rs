//! mdexport CLI - Markdown to Word/PDF/HTML converter.
//!
//! Provides commands for:
//! - `convert`: Convert a Markdown file locally or on a running server
//! - `serve`: Start the REST and MCP server
//! - `tools`: List the available conversion tools

mod commands;
mod error;
mod output;
mod remote;

use std::path::Path;

use clap::{Parser, Subcommand};
use mdexport_config::Config;
use tracing_subscriber::EnvFilter;

use commands::{ConvertArgs, ServeArgs, ToolsArgs};
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// mdexport - Markdown to Word/PDF/HTML converter.
#[derive(Parser)]
#[command(name = "mdexport", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Markdown file.
    Convert(ConvertArgs),
    /// Start the conversion server.
    Serve(ServeArgs),
    /// List available conversion tools.
    Tools(ToolsArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Convert(args) => args.verbose,
            Self::Serve(args) => args.verbose,
            Self::Tools(_) => false,
        }
    }

    fn config_path(&self) -> Option<&Path> {
        match self {
            Self::Convert(args) => args.config_path(),
            Self::Serve(args) => args.config_path(),
            Self::Tools(_) => None,
        }
    }
}

/// Build the log filter.
///
/// `--verbose` enables INFO level, otherwise `RUST_LOG` is used, falling back
/// to `logging.level` from the configuration file.
fn log_filter(command: &Commands) -> EnvFilter {
    if command.verbose() {
        return EnvFilter::new("info");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = Config::load(command.config_path(), None)
            .map_or("warn", |config| config.logging.filter_directive());
        EnvFilter::new(level)
    })
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&cli.command))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Serve(args) => match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(args.execute(VERSION)),
            Err(e) => Err(CliError::Server(format!(
                "Failed to create tokio runtime: {e}"
            ))),
        },
        Commands::Tools(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
