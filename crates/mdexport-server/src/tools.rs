//! Conversion tools shared by the REST and MCP surfaces.
//!
//! A tool takes Markdown either inline (`content`) or from disk
//! (`file_path`), converts it to one format and optionally saves the result
//! under the configured output directory.

use std::path::{Path, PathBuf};

use mdexport_config::{Config, ConfigError, SecurityConfig};
use mdexport_renderer::{Converter, OutputFormat, TextCleaner};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Stem used for saved files when the input came inline.
const INLINE_STEM: &str = "document";

/// A conversion tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Word,
    Pdf,
    Html,
}

impl Tool {
    /// All tools in listing order.
    pub const ALL: [Self; 3] = [Self::Word, Self::Pdf, Self::Html];

    /// Tool name as exposed over MCP.
    pub fn name(self) -> &'static str {
        match self {
            Self::Word => "convert_markdown_to_word",
            Self::Pdf => "convert_markdown_to_pdf",
            Self::Html => "convert_markdown_to_html",
        }
    }

    /// Look up a tool by MCP name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Output format produced by this tool.
    pub fn format(self) -> OutputFormat {
        match self {
            Self::Word => OutputFormat::Word,
            Self::Pdf => OutputFormat::Pdf,
            Self::Html => OutputFormat::Html,
        }
    }

    fn description(self) -> String {
        format!(
            "Convert markdown content to {}. Can accept either markdown content directly or a \
             file path to read markdown from. If file_path is provided, it will automatically \
             read the file content.",
            match self {
                Self::Word => "Word document",
                Self::Pdf => "PDF",
                Self::Html => "HTML",
            }
        )
    }

    /// MCP tool definition with its input schema.
    pub fn definition(self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": {
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Markdown content (optional if file_path is provided)"
                    },
                    "file_path": {
                        "type": "string",
                        "description": "Path to markdown file to read (optional if content is provided)"
                    }
                }
            }
        })
    }
}

/// Tool arguments.
#[derive(Debug, Default, Deserialize)]
pub struct ToolInput {
    /// Inline Markdown.
    pub content: Option<String>,
    /// Markdown file to read. Takes precedence over `content`.
    pub file_path: Option<String>,
}

/// Where the Markdown came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Content,
    File,
}

/// Result of a successful tool run.
#[derive(Debug)]
pub struct ToolOutput {
    /// Produced format.
    pub format: OutputFormat,
    /// Serialized document.
    pub bytes: Vec<u8>,
    /// Saved copy, when an output directory is configured.
    pub saved_to: Option<PathBuf>,
    /// Input origin.
    pub source: InputSource,
}

/// Tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Either 'content' or 'file_path' must be provided")]
    MissingInput,

    #[error("File type not allowed: {}", .0.display())]
    Disallowed(PathBuf),

    #[error("File {} is {size} bytes, exceeding the {limit} byte limit", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Failed to read file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error converting markdown to {label}: {message}")]
    Conversion { label: &'static str, message: String },
}

impl ToolError {
    /// Whether the error is caused by the caller's arguments.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Conversion { .. })
    }
}

/// Runs conversion tools with shared converter settings and input limits.
#[derive(Clone)]
pub struct ToolRegistry {
    converter: Converter,
    security: SecurityConfig,
    max_file_size: u64,
    output_dir: Option<PathBuf>,
}

impl ToolRegistry {
    /// Create a registry with default input limits and no output directory.
    pub fn new(converter: Converter) -> Self {
        let security = SecurityConfig::default();
        let max_file_size = security.max_file_size_bytes().unwrap_or(u64::MAX);
        Self {
            converter,
            security,
            max_file_size,
            output_dir: None,
        }
    }

    /// Build a registry from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `security.max_file_size` is malformed.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            converter: converter_from_config(config),
            max_file_size: config.security.max_file_size_bytes()?,
            security: config.security.clone(),
            output_dir: Some(config.paths.output_dir.clone()),
        })
    }

    /// Save converted files under `dir`.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Replace the input restrictions.
    ///
    /// # Errors
    ///
    /// Returns an error if `security.max_file_size` is malformed.
    pub fn with_security(mut self, security: SecurityConfig) -> Result<Self, ConfigError> {
        self.max_file_size = security.max_file_size_bytes()?;
        self.security = security;
        Ok(self)
    }

    /// Definitions of every tool.
    pub fn definitions() -> Vec<Value> {
        Tool::ALL.into_iter().map(Tool::definition).collect()
    }

    /// Resolve tool arguments to Markdown text.
    fn read_input(&self, input: &ToolInput) -> Result<(String, InputSource, Option<PathBuf>), ToolError> {
        if let Some(file_path) = input.file_path.as_deref().filter(|p| !p.is_empty()) {
            let path = PathBuf::from(file_path);
            if !self.security.is_allowed(&path) {
                return Err(ToolError::Disallowed(path));
            }

            let read_err = |source| ToolError::Read {
                path: path.clone(),
                source,
            };
            let size = std::fs::metadata(&path).map_err(read_err)?.len();
            if size > self.max_file_size {
                return Err(ToolError::TooLarge {
                    path,
                    size,
                    limit: self.max_file_size,
                });
            }
            let content = std::fs::read_to_string(&path).map_err(read_err)?;
            tracing::info!(path = %path.display(), chars = content.len(), "Read markdown file");
            return Ok((content, InputSource::File, Some(path)));
        }

        match input.content.as_deref() {
            Some(content) if !content.is_empty() => {
                Ok((content.to_owned(), InputSource::Content, None))
            }
            _ => Err(ToolError::MissingInput),
        }
    }

    /// Run `tool` synchronously.
    ///
    /// # Errors
    ///
    /// Returns an error for missing or rejected input, or if conversion fails.
    pub fn run(&self, tool: Tool, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        let format = tool.format();
        let (content, source, input_path) = self.read_input(input)?;
        let conversion_err = |message: String| ToolError::Conversion {
            label: format.label(),
            message,
        };

        let converter = match input_path.as_deref().and_then(Path::parent) {
            Some(base) => self.converter.clone().with_base_dir(base),
            None => self.converter.clone(),
        };

        let Some(output_dir) = &self.output_dir else {
            let bytes = converter
                .render_standalone(&content, format)
                .map_err(|e| conversion_err(e.to_string()))?;
            return Ok(ToolOutput {
                format,
                bytes,
                saved_to: None,
                source,
            });
        };

        std::fs::create_dir_all(output_dir).map_err(|e| conversion_err(e.to_string()))?;
        let stem = input_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .unwrap_or(INLINE_STEM);
        let target = output_dir.join(format!("{stem}.{}", format.extension()));

        let bytes = converter
            .render(&content, format, output_dir)
            .map_err(|e| conversion_err(e.to_string()))?;
        std::fs::write(&target, &bytes).map_err(|e| conversion_err(e.to_string()))?;

        tracing::info!(
            tool = tool.name(),
            path = %target.display(),
            size = bytes.len(),
            "Conversion successful"
        );
        Ok(ToolOutput {
            format,
            bytes,
            saved_to: Some(target),
            source,
        })
    }
}

/// Build a converter from loaded configuration.
pub fn converter_from_config(config: &Config) -> Converter {
    let conversion = &config.conversion;
    let cleaner = TextCleaner::new()
        .remove_emoji(conversion.remove_emoji)
        .remove_unicode(conversion.remove_unicode);

    let mut converter = Converter::new()
        .with_cleaner(cleaner)
        .with_images(conversion.enable_images)
        .with_table_alignment(conversion.table_alignment())
        .with_temp_dir(&config.paths.temp_dir);

    if conversion.enable_mermaid {
        let diagrams = &config.diagrams_resolved;
        converter = converter.with_diagrams(mdexport_diagrams::select_renderer(
            diagrams.kroki_url.as_deref(),
            diagrams.mmdc_path.as_deref(),
            diagrams.timeout,
        ));
    }
    if let Some(header_footer) = &config.header_footer_resolved {
        converter = converter.with_header_footer(header_footer.clone());
    }
    converter
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn content(text: &str) -> ToolInput {
        ToolInput {
            content: Some(text.to_owned()),
            file_path: None,
        }
    }

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("get_summary"), None);
    }

    #[test]
    fn test_definitions() {
        let definitions = ToolRegistry::definitions();
        assert_eq!(definitions.len(), 3);
        assert_eq!(definitions[0]["name"], "convert_markdown_to_word");
        assert_eq!(definitions[2]["inputSchema"]["type"], "object");
        assert!(definitions[1]["inputSchema"]["properties"]["file_path"].is_object());
    }

    #[test]
    fn test_missing_input() {
        let registry = ToolRegistry::new(Converter::new());
        let err = registry.run(Tool::Html, &ToolInput::default()).unwrap_err();
        assert!(matches!(err, ToolError::MissingInput));
        assert_eq!(
            err.to_string(),
            "Either 'content' or 'file_path' must be provided"
        );

        let err = registry.run(Tool::Html, &content("")).unwrap_err();
        assert!(matches!(err, ToolError::MissingInput));
    }

    #[test]
    fn test_inline_content_not_saved_without_output_dir() {
        let registry = ToolRegistry::new(Converter::new());
        let output = registry.run(Tool::Html, &content("# Hi")).unwrap();
        assert_eq!(output.source, InputSource::Content);
        assert_eq!(output.saved_to, None);
        assert!(String::from_utf8(output.bytes).unwrap().contains("<h1>Hi</h1>"));
    }

    /// Renderer that writes a fixed payload for every diagram.
    struct StubRenderer;

    impl mdexport_renderer::DiagramRenderer for StubRenderer {
        fn render(&self, _source: &str, output_dir: &Path) -> Option<PathBuf> {
            let path = output_dir.join("diagram.png");
            std::fs::write(&path, b"png").ok()?;
            Some(path)
        }
    }

    #[test]
    fn test_unsaved_html_embeds_diagrams() {
        let converter = Converter::new().with_diagrams(std::sync::Arc::new(StubRenderer));
        let registry = ToolRegistry::new(converter);

        let output = registry
            .run(Tool::Html, &content("```mermaid\ngraph TD\n```"))
            .unwrap();

        let html = String::from_utf8(output.bytes).unwrap();
        assert!(html.contains(r#"src="data:image/png;base64,cG5n""#));
        assert!(!html.contains("images/diagram_"));
    }

    #[test]
    fn test_saved_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(Converter::new()).with_output_dir(dir.path());

        let output = registry.run(Tool::Pdf, &content("# Hi")).unwrap();

        let saved = output.saved_to.unwrap();
        assert_eq!(saved, dir.path().join("document.pdf"));
        assert_eq!(std::fs::read(&saved).unwrap(), output.bytes);
    }

    #[test]
    fn test_file_input_uses_stem() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let path = src.path().join("notes.md");
        std::fs::write(&path, "# Notes").unwrap();
        let registry = ToolRegistry::new(Converter::new()).with_output_dir(out.path());

        let output = registry
            .run(
                Tool::Word,
                &ToolInput {
                    content: Some("ignored".to_owned()),
                    file_path: Some(path.to_string_lossy().into_owned()),
                },
            )
            .unwrap();

        assert_eq!(output.source, InputSource::File);
        assert_eq!(output.saved_to, Some(out.path().join("notes.docx")));
    }

    #[test]
    fn test_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "# Notes").unwrap();
        let registry = ToolRegistry::new(Converter::new());

        let err = registry
            .run(
                Tool::Html,
                &ToolInput {
                    content: None,
                    file_path: Some(path.to_string_lossy().into_owned()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Disallowed(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.md");
        std::fs::write(&path, "x".repeat(2048)).unwrap();
        let security = SecurityConfig {
            max_file_size: "1KB".to_owned(),
            ..SecurityConfig::default()
        };
        let registry = ToolRegistry::new(Converter::new())
            .with_security(security)
            .unwrap();

        let err = registry
            .run(
                Tool::Html,
                &ToolInput {
                    content: None,
                    file_path: Some(path.to_string_lossy().into_owned()),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::TooLarge {
                size: 2048,
                limit: 1024,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new(Converter::new());
        let err = registry
            .run(
                Tool::Pdf,
                &ToolInput {
                    content: None,
                    file_path: Some(dir.path().join("absent.md").to_string_lossy().into_owned()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Read { .. }));
        assert!(err.to_string().starts_with("Failed to read file"));
    }
}
