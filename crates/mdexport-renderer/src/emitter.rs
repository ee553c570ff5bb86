//! Output emitter interface.
//!
//! The three output formats share one contract: [`emit`] walks classified
//! [`BlockEvent`]s once and calls the matching [`Emitter`] method for each
//! element. Consecutive table rows are grouped into a single [`Table`]
//! before they reach the emitter.

use std::path::Path;

use crate::classify::{BlockEvent, DIAGRAM_LANGUAGE};
use crate::error::RenderError;

/// A run of table rows, separator rows removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table<'a> {
    /// Rows in source order.
    pub rows: Vec<&'a [String]>,
    /// Whether the first row was followed by a separator row.
    pub has_header: bool,
}

impl Table<'_> {
    /// Number of columns (widest row).
    #[must_use]
    pub fn columns(&self) -> usize {
        self.rows.iter().map(|row| row.len()).max().unwrap_or(0)
    }
}

/// Format-specific document builder.
///
/// Element methods are infallible: an element that cannot be produced
/// (e.g. an unreadable image) is replaced by a placeholder inside the
/// emitter. Only [`Emitter::finish`] can fail.
pub trait Emitter {
    /// File extension without the dot.
    const EXTENSION: &'static str;

    /// MIME type of the serialized document.
    const MIME_TYPE: &'static str;

    /// Heading of level 1-4. Text carries raw inline markup.
    fn heading(&mut self, level: u8, text: &str);

    /// Unordered list item.
    fn bullet_item(&mut self, text: &str);

    /// Ordered list item with its source number.
    fn ordered_item(&mut self, number: u64, text: &str);

    /// Table of plain-text cells.
    fn table(&mut self, table: &Table<'_>);

    /// Fenced code block; lines are verbatim.
    fn code_block(&mut self, language: Option<&str>, lines: &[String]);

    /// Rendered diagram image.
    fn diagram(&mut self, path: &Path);

    /// Standalone image file with alternative text.
    fn image(&mut self, path: &Path, alt: &str);

    /// Diagram that could not be rendered.
    fn diagram_fallback(&mut self, source: &str);

    /// Blank source line.
    fn blank(&mut self);

    /// Paragraph. Text carries raw inline markup.
    fn paragraph(&mut self, text: &str);

    /// Serialize the document.
    fn finish(self) -> Result<Vec<u8>, RenderError>;
}

/// Placeholder label for a standalone image that could not be embedded.
pub(crate) fn image_label(alt: &str) -> String {
    if alt.is_empty() {
        "[Image]".to_owned()
    } else {
        format!("[Image: {alt}]")
    }
}

/// Drive `emitter` over `events` and serialize the result.
pub fn emit<E: Emitter>(mut emitter: E, events: &[BlockEvent]) -> Result<Vec<u8>, RenderError> {
    let mut table = Table {
        rows: Vec::new(),
        has_header: false,
    };

    for event in events {
        match event {
            BlockEvent::TableRow { cells } => {
                table.rows.push(cells);
                continue;
            }
            BlockEvent::TableSeparator => {
                if table.rows.len() == 1 {
                    table.has_header = true;
                }
                continue;
            }
            _ => flush_table(&mut emitter, &mut table),
        }

        match event {
            BlockEvent::Heading { level, text } => emitter.heading(*level, text),
            BlockEvent::BulletItem { text } => emitter.bullet_item(text),
            BlockEvent::OrderedItem { number, text } => emitter.ordered_item(*number, text),
            BlockEvent::CodeBlock { language, lines } => {
                emitter.code_block(language.as_deref(), lines);
            }
            BlockEvent::DiagramBlock { source } => {
                let lines: Vec<String> = source.split('\n').map(str::to_owned).collect();
                emitter.code_block(Some(DIAGRAM_LANGUAGE), &lines);
            }
            BlockEvent::Diagram { path } => emitter.diagram(path),
            BlockEvent::Image { path, alt } => emitter.image(path, alt),
            BlockEvent::DiagramFallback { source } => emitter.diagram_fallback(source),
            BlockEvent::Blank => emitter.blank(),
            BlockEvent::Paragraph { text } => emitter.paragraph(text),
            BlockEvent::TableRow { .. } | BlockEvent::TableSeparator => {}
        }
    }

    flush_table(&mut emitter, &mut table);
    emitter.finish()
}

fn flush_table<E: Emitter>(emitter: &mut E, table: &mut Table<'_>) {
    if !table.rows.is_empty() {
        emitter.table(table);
    }
    table.rows.clear();
    table.has_header = false;
}
