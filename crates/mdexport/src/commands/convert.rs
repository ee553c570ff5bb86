//! `mdexport convert` command implementation.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use mdexport_config::{CliSettings, Config, load_header_footer};
use mdexport_renderer::{OutputFormat, extract_metadata, validate_content};
use mdexport_server::{Tool, converter_from_config};

use crate::error::CliError;
use crate::output::Output;
use crate::remote::McpClient;

/// Requested output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatArg {
    Word,
    Pdf,
    Html,
    All,
}

impl FormatArg {
    fn formats(self) -> Vec<OutputFormat> {
        match self {
            Self::Word => vec![OutputFormat::Word],
            Self::Pdf => vec![OutputFormat::Pdf],
            Self::Html => vec![OutputFormat::Html],
            Self::All => OutputFormat::ALL.to_vec(),
        }
    }
}

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output format (default: `conversion.default_format` from config).
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Directory for converted files (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Exact output file path (single format only).
    #[arg(long, conflicts_with = "output_dir")]
    output_file: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdexport.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Header/footer TOML file (overrides `[header_footer]` in config).
    #[arg(long)]
    header_footer: Option<PathBuf>,

    /// Disable Mermaid diagram rendering.
    #[arg(long)]
    no_mermaid: bool,

    /// Convert on a running server's MCP endpoint, e.g. `http://localhost:8001/mcp`.
    #[arg(long, env = "MDEXPORT_REMOTE")]
    remote: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Configuration file given on the command line.
    pub(crate) fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read, configuration fails or
    /// any conversion fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output_dir.clone(),
            enable_mermaid: self.no_mermaid.then_some(false),
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let formats = self
            .format
            .map_or_else(|| vec![config.conversion.output_format()], FormatArg::formats);
        if self.output_file.is_some() && formats.len() > 1 {
            return Err(CliError::Validation(
                "--output-file cannot be used with --format all".to_owned(),
            ));
        }

        let content = std::fs::read_to_string(&self.input).map_err(|e| {
            CliError::Validation(format!("Cannot read {}: {e}", self.input.display()))
        })?;

        let warnings = validate_content(&content);
        for warning in &warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        let targets: Vec<(OutputFormat, PathBuf)> = formats
            .into_iter()
            .map(|format| (format, self.target_path(format, &config.paths.output_dir)))
            .collect();
        for (_, path) in &targets {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        output.info(&format!("Converting {}...", self.input.display()));
        if let Some(title) = extract_metadata(&content).get("title") {
            output.detail(&format!("Title: {title}"));
        }
        match &self.remote {
            Some(url) => convert_remote(&output, url, &content, &targets),
            None => self.convert_local(&output, &config, &content, &targets),
        }
    }

    fn convert_local(
        &self,
        output: &Output,
        config: &Config,
        content: &str,
        targets: &[(OutputFormat, PathBuf)],
    ) -> Result<(), CliError> {
        let mut converter = converter_from_config(config);
        if let Some(path) = &self.header_footer {
            converter = converter.with_header_footer(load_header_footer(path)?);
        }
        if let Some(dir) = self.input.parent().filter(|p| !p.as_os_str().is_empty()) {
            converter = converter.with_base_dir(dir);
        }

        let mut failures = 0;
        for (format, path) in targets {
            let outcome = converter.convert(content, *format, path);
            if outcome.success {
                output.success(&outcome.message);
                output.detail(&format!("{} ({})", format_size(outcome.size), format.mime_type()));
            } else {
                output.error(&outcome.message);
                failures += 1;
            }
        }

        if failures > 0 {
            return Err(CliError::Conversion(format!(
                "{failures} of {} conversions failed",
                targets.len()
            )));
        }
        Ok(())
    }

    /// Output path for `format`: `--output-file`, or `<dir>/<input stem>.<ext>`.
    fn target_path(&self, format: OutputFormat, output_dir: &Path) -> PathBuf {
        if let Some(file) = &self.output_file {
            return file.clone();
        }
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        output_dir.join(format!("{stem}.{}", format.extension()))
    }
}

fn convert_remote(
    output: &Output,
    url: &str,
    content: &str,
    targets: &[(OutputFormat, PathBuf)],
) -> Result<(), CliError> {
    let mut client = McpClient::new(url);
    for (format, path) in targets {
        let tool = Tool::ALL
            .into_iter()
            .find(|tool| tool.format() == *format)
            .ok_or_else(|| CliError::Validation(format!("No remote tool for {format}")))?;
        let bytes = client.convert(tool.name(), content)?;
        std::fs::write(path, &bytes)?;
        output.success(&format!(
            "Converted remotely to {}: {}",
            format.label(),
            path.display()
        ));
        output.detail(&format_size(bytes.len()));
    }
    Ok(())
}

/// Human-readable size with binary units.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.1} {unit}")
}
