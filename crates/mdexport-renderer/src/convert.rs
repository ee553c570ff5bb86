//! Conversion entry point.
//!
//! [`Converter`] ties the pipeline together: clean the source, classify it
//! (rendering diagrams into a per-call temporary directory), drive the
//! emitter for the requested format and write the result. Failures never
//! escape as errors; they are logged and reported in [`ConversionOutcome`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tempfile::TempDir;

use crate::analyze::validate_content;
use crate::classify::{BlockEvent, Classifier};
use crate::clean::TextCleaner;
use crate::decorator::{Alignment, HeaderFooterConfig};
use crate::diagram::DiagramRenderer;
use crate::docx::DocxEmitter;
use crate::emitter::{Emitter, emit};
use crate::error::{RenderError, UnknownFormatError};
use crate::html::HtmlEmitter;
use crate::pdf::PdfEmitter;

/// Target document format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum OutputFormat {
    /// Office Open XML word processing document.
    Word,
    /// Portable Document Format.
    Pdf,
    /// Standalone HTML page.
    Html,
}

impl OutputFormat {
    /// All formats in display order.
    pub const ALL: [Self; 3] = [Self::Word, Self::Pdf, Self::Html];

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Word => DocxEmitter::EXTENSION,
            Self::Pdf => PdfEmitter::EXTENSION,
            Self::Html => HtmlEmitter::EXTENSION,
        }
    }

    /// MIME type of the produced document.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Word => DocxEmitter::MIME_TYPE,
            Self::Pdf => PdfEmitter::MIME_TYPE,
            Self::Html => HtmlEmitter::MIME_TYPE,
        }
    }

    /// Lowercase identifier used in configuration and tool names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Word => "Word",
            Self::Pdf => "PDF",
            Self::Html => "HTML",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "word" | "docx" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(UnknownFormatError(s.to_owned())),
        }
    }
}

/// Result of one conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConversionOutcome {
    /// Whether the output file was written.
    pub success: bool,
    /// Summary suitable for display.
    pub message: String,
    /// Written file, on success.
    pub output_path: Option<PathBuf>,
    /// Size of the written file in bytes.
    pub size: usize,
    /// Content validation warnings.
    pub warnings: Vec<String>,
}

/// Configurable Markdown converter.
///
/// # Example
///
/// ```no_run
/// use mdexport_renderer::{Converter, OutputFormat};
///
/// let outcome = Converter::new().convert("# Hello", OutputFormat::Html, "out/hello.html".as_ref());
/// assert!(outcome.success);
/// ```
#[derive(Clone, Default)]
pub struct Converter {
    header_footer: Option<HeaderFooterConfig>,
    diagrams: Option<Arc<dyn DiagramRenderer>>,
    cleaner: TextCleaner,
    images: bool,
    table_alignment: Alignment,
    temp_root: Option<PathBuf>,
    base_dir: Option<PathBuf>,
}

impl Converter {
    /// Create a converter with default cleaning, images enabled and no
    /// diagram renderer or header/footer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: true,
            table_alignment: Alignment::Left,
            ..Self::default()
        }
    }

    /// Decorate Word and PDF output with a header and footer.
    #[must_use]
    pub fn with_header_footer(mut self, config: HeaderFooterConfig) -> Self {
        self.header_footer = Some(config);
        self
    }

    /// Render diagram blocks through `renderer`.
    #[must_use]
    pub fn with_diagrams(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.diagrams = Some(renderer);
        self
    }

    /// Replace the text cleaner.
    #[must_use]
    pub fn with_cleaner(mut self, cleaner: TextCleaner) -> Self {
        self.cleaner = cleaner;
        self
    }

    /// Enable or disable standalone image lines.
    #[must_use]
    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    /// Set Word table alignment.
    #[must_use]
    pub fn with_table_alignment(mut self, alignment: Alignment) -> Self {
        self.table_alignment = alignment;
        self
    }

    /// Create per-call working directories under `dir` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Resolve relative image paths against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn workdir(&self) -> Result<TempDir, RenderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mdexport-");
        match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                Ok(builder.tempdir_in(root)?)
            }
            None => Ok(builder.tempdir()?),
        }
    }

    fn resolve_images(&self, events: &mut [BlockEvent]) {
        let Some(base) = &self.base_dir else {
            return;
        };
        for event in events {
            if let BlockEvent::Image { path, .. } = event
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
    }

    /// Produce the serialized document without writing it.
    ///
    /// `output_dir` is where the HTML emitter places copied diagram images.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be created or the
    /// document cannot be serialized.
    pub fn render(
        &self,
        content: &str,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_with(content, format, HtmlEmitter::new(output_dir))
    }

    /// Produce the serialized document without an output location.
    ///
    /// HTML output embeds rendered diagrams as data URIs, so the page does
    /// not depend on files that outlive the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be created or the
    /// document cannot be serialized.
    pub fn render_standalone(
        &self,
        content: &str,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_with(content, format, HtmlEmitter::standalone())
    }

    fn render_with(
        &self,
        content: &str,
        format: OutputFormat,
        html: HtmlEmitter,
    ) -> Result<Vec<u8>, RenderError> {
        let cleaned = self.cleaner.clean(content);

        // Dropped on every return path, removing rendered diagrams.
        let workdir = self.workdir()?;

        let mut classifier = Classifier::new().with_images(self.images);
        if let Some(renderer) = &self.diagrams {
            classifier = classifier.with_diagrams(renderer.as_ref(), workdir.path());
        }
        let mut events = classifier.classify(&cleaned);
        self.resolve_images(&mut events);

        tracing::debug!(format = %format, events = events.len(), "Emitting document");

        match format {
            OutputFormat::Word => emit(
                DocxEmitter::new()
                    .with_header_footer(self.header_footer.clone())
                    .with_table_alignment(self.table_alignment),
                &events,
            ),
            OutputFormat::Pdf => emit(
                PdfEmitter::new().with_header_footer(self.header_footer.clone()),
                &events,
            ),
            OutputFormat::Html => emit(html, &events),
        }
    }

    fn write(&self, content: &str, format: OutputFormat, output_path: &Path) -> Result<usize, RenderError> {
        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&output_dir)?;

        let bytes = self.render(content, format, &output_dir)?;
        std::fs::write(output_path, &bytes)?;
        Ok(bytes.len())
    }

    /// Convert Markdown and write the result to `output_path`.
    ///
    /// Never fails: errors are logged and reported with `success: false`.
    #[must_use]
    pub fn convert(&self, content: &str, format: OutputFormat, output_path: &Path) -> ConversionOutcome {
        let warnings = validate_content(content);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Content validation");
        }

        match self.write(content, format, output_path) {
            Ok(size) => {
                tracing::info!(
                    format = %format,
                    path = %output_path.display(),
                    bytes = size,
                    "Converted markdown"
                );
                ConversionOutcome {
                    success: true,
                    message: format!(
                        "Successfully converted markdown to {}: {}",
                        format.label(),
                        output_path.display()
                    ),
                    output_path: Some(output_path.to_path_buf()),
                    size,
                    warnings,
                }
            }
            Err(e) => {
                tracing::error!(format = %format, error = %e, "Error converting markdown");
                ConversionOutcome {
                    success: false,
                    message: format!("Error converting markdown to {}: {e}", format.label()),
                    output_path: None,
                    size: 0,
                    warnings,
                }
            }
        }
    }
}

/// Convert with default settings and no diagram renderer.
#[must_use]
pub fn convert(content: &str, format: OutputFormat, output_path: &Path) -> ConversionOutcome {
    Converter::new().convert(content, format, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("WORD".parse::<OutputFormat>().unwrap(), OutputFormat::Word);
        assert_eq!("docx".parse::<OutputFormat>().unwrap(), OutputFormat::Word);
        assert_eq!("htm".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("rtf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Pdf.to_string(), "pdf");
        assert_eq!(OutputFormat::Pdf.label(), "PDF");
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(OutputFormat::Word.extension(), "docx");
        assert_eq!(OutputFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(OutputFormat::Html.mime_type(), "text/html");
    }

    #[test]
    fn test_convert_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.html");

        let outcome = convert("# Hi", OutputFormat::Html, &path);

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.output_path.as_deref(), Some(path.as_path()));
        let html = std::fs::read_to_string(&path).unwrap();
        assert_eq!(outcome.size, html.len());
        assert!(html.contains("<h1>Hi</h1>"));
    }

    #[test]
    fn test_convert_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten with a file.
        let outcome = convert("text", OutputFormat::Pdf, dir.path());
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Error converting markdown to PDF"));
        assert_eq!(outcome.output_path, None);
    }

    #[test]
    fn test_convert_collects_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = convert("```\ncode", OutputFormat::Html, &dir.path().join("a.html"));
        assert!(outcome.success);
        assert_eq!(outcome.warnings, vec!["Unclosed code block detected"]);
    }

    #[test]
    fn test_cleaner_applied() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new();
        let bytes = converter
            .render("# Caf\u{e9} \u{1F600}", OutputFormat::Html, dir.path())
            .unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("<h1>Cafe</h1>"));
    }

    #[test]
    fn test_base_dir_resolves_images() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new().with_base_dir("/docs");
        let html = converter
            .render("![logo](img/a.png)", OutputFormat::Html, dir.path())
            .unwrap();
        assert!(String::from_utf8(html).unwrap().contains(r#"src="/docs/img/a.png""#));
    }

    #[test]
    fn test_base_dir_resolves_image_with_diagram_alt() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new().with_base_dir("/docs");
        let html = converter
            .render("![Mermaid Diagram](img/flow.png)", OutputFormat::Html, dir.path())
            .unwrap();
        assert!(String::from_utf8(html).unwrap().contains(r#"src="/docs/img/flow.png""#));
    }

    #[test]
    fn test_temp_dir_removed() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let converter = Converter::new().with_temp_dir(root.path().join("work"));

        converter
            .render("text", OutputFormat::Word, out.path())
            .unwrap();

        let leftovers = std::fs::read_dir(root.path().join("work")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
