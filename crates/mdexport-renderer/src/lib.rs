//! Markdown to Word, PDF and HTML conversion.
//!
//! The pipeline is line oriented:
//!
//! 1. [`TextCleaner`] strips emoji and transliterates non-ASCII text.
//! 2. [`Classifier`] walks the source once and produces [`BlockEvent`]s,
//!    resolving diagram blocks through an optional [`DiagramRenderer`].
//! 3. [`emit`] drives an [`Emitter`] (Word, PDF or HTML) over the events.
//!    Inline spans are formatted at this stage with [`format_inline`].
//! 4. Word and PDF output are decorated with a header and footer from
//!    [`HeaderFooterConfig`].
//!
//! [`Converter`] wraps all of this and writes the result to disk.
//!
//! # Example
//!
//! ```
//! use mdexport_renderer::{BlockEvent, HtmlEmitter, classify, emit};
//!
//! let events = classify("# Title\n\nSome **bold** text");
//! assert!(matches!(events[0], BlockEvent::Heading { level: 1, .. }));
//!
//! let dir = std::env::temp_dir();
//! let html = emit(HtmlEmitter::new(&dir), &events).unwrap();
//! let html = String::from_utf8(html).unwrap();
//! assert!(html.contains("<h1>Title</h1>"));
//! assert!(html.contains("<b>bold</b>"));
//! ```

mod analyze;
mod classify;
mod clean;
mod convert;
mod decorator;
mod diagram;
mod docx;
mod emitter;
mod error;
mod html;
mod inline;
mod pdf;
mod util;

pub use analyze::{extract_metadata, validate_content};
pub use classify::{BlockEvent, Classifier, DIAGRAM_ALT, DIAGRAM_LANGUAGE, classify, is_file_structure_line};
pub use clean::{TextCleaner, clean};
pub use convert::{ConversionOutcome, Converter, OutputFormat, convert};
pub use decorator::{Alignment, HeaderFooterConfig, HeaderFooterStyle, PageMargins};
pub use diagram::DiagramRenderer;
pub use docx::DocxEmitter;
pub use emitter::{Emitter, Table, emit};
pub use error::{DecorationError, RenderError, UnknownFormatError};
pub use html::{HtmlEmitter, IMAGES_DIR};
pub use inline::{InlineMode, InlineSpan, format_inline, parse_inline};
pub use pdf::PdfEmitter;
