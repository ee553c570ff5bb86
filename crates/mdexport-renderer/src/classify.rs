//! Line-oriented block classification.
//!
//! [`Classifier`] walks Markdown source once, line by line, and produces a
//! flat sequence of [`BlockEvent`]s. Fenced code and diagram blocks consume
//! every line up to their closing fence (or end of input) and are never
//! reinterpreted as other blocks. Table rows are buffered until the run ends
//! so that a lone row can fall back to paragraph text.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::diagram::DiagramRenderer;

static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\. (.*)$").unwrap());
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)$").unwrap());
static FILE_STRUCTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+[a-zA-Z0-9_\-\./]+").unwrap());

/// Fence language tag that marks a diagram block.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Label and alt text for rendered diagrams.
pub const DIAGRAM_ALT: &str = "Mermaid Diagram";

const FENCE: &str = "```";

/// One classified structural unit of a Markdown document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockEvent {
    /// `#` to `####` heading.
    Heading {
        /// Heading level (1-4).
        level: u8,
        /// Raw heading text (inline markup not yet applied).
        text: String,
    },
    /// `- item` or `* item`.
    BulletItem {
        /// Raw item text.
        text: String,
    },
    /// `1. item`.
    OrderedItem {
        /// Number as written in the source.
        number: u64,
        /// Raw item text.
        text: String,
    },
    /// One table row with trimmed cell text.
    TableRow {
        /// Cells in column order.
        cells: Vec<String>,
    },
    /// Dash/colon row separating the header from the body. Never rendered.
    TableSeparator,
    /// Fenced code block.
    CodeBlock {
        /// Language tag after the opening fence, if any.
        language: Option<String>,
        /// Lines between the fences, verbatim.
        lines: Vec<String>,
    },
    /// Diagram block left unrendered because no renderer is attached.
    DiagramBlock {
        /// Diagram source text.
        source: String,
    },
    /// Diagram rendered to an image file.
    Diagram {
        /// Rendered image path inside the working directory.
        path: PathBuf,
    },
    /// Standalone `![alt](path)` line.
    Image {
        /// Image file path.
        path: PathBuf,
        /// Alternative text.
        alt: String,
    },
    /// Diagram whose rendering failed; carries the original source.
    DiagramFallback {
        /// Diagram source text.
        source: String,
    },
    /// Empty or whitespace-only line.
    Blank,
    /// Any other line.
    Paragraph {
        /// Raw line text with trailing whitespace removed.
        text: String,
    },
}

/// Check whether a line looks like an entry of an indented file tree.
#[must_use]
pub fn is_file_structure_line(text: &str) -> bool {
    FILE_STRUCTURE_RE.is_match(text)
}

/// Collection state for an open fence.
struct OpenFence {
    language: Option<String>,
    lines: Vec<String>,
}

/// Single-pass Markdown block classifier.
///
/// # Example
///
/// ```
/// use mdexport_renderer::{BlockEvent, Classifier};
///
/// let events = Classifier::new().classify("# Title\n\nBody");
/// assert_eq!(events.len(), 3);
/// assert!(matches!(events[0], BlockEvent::Heading { level: 1, .. }));
/// ```
pub struct Classifier<'a> {
    diagrams: Option<(&'a dyn DiagramRenderer, &'a Path)>,
    images: bool,
}

impl Default for Classifier<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Classifier<'a> {
    /// Create a classifier without diagram rendering and with image lines enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagrams: None,
            images: true,
        }
    }

    /// Resolve diagram blocks through `renderer`, writing images into `output_dir`.
    #[must_use]
    pub fn with_diagrams(mut self, renderer: &'a dyn DiagramRenderer, output_dir: &'a Path) -> Self {
        self.diagrams = Some((renderer, output_dir));
        self
    }

    /// Enable or disable recognition of standalone `![alt](path)` lines.
    #[must_use]
    pub fn with_images(mut self, enabled: bool) -> Self {
        self.images = enabled;
        self
    }

    /// Classify a whole document.
    #[must_use]
    pub fn classify(&self, source: &str) -> Vec<BlockEvent> {
        self.classify_lines(source.lines())
    }

    /// Classify an ordered sequence of lines.
    pub fn classify_lines<'l, I>(&self, lines: I) -> Vec<BlockEvent>
    where
        I: IntoIterator<Item = &'l str>,
    {
        let mut events = Vec::new();
        let mut fence: Option<OpenFence> = None;
        let mut table: Vec<&'l str> = Vec::new();

        for raw in lines {
            if fence.is_some() {
                if raw.trim_end() == FENCE {
                    if let Some(open) = fence.take() {
                        events.push(self.close_fence(open));
                    }
                } else if let Some(open) = fence.as_mut() {
                    open.lines.push(raw.to_owned());
                }
                continue;
            }

            let line = raw.trim_end();

            if is_table_line(line) {
                table.push(line);
                continue;
            }
            flush_table(&mut table, &mut events);

            if let Some(tag) = line.strip_prefix(FENCE) {
                let tag = tag.trim();
                fence = Some(OpenFence {
                    language: (!tag.is_empty()).then(|| tag.to_owned()),
                    lines: Vec::new(),
                });
                continue;
            }

            events.push(self.classify_line(line));
        }

        flush_table(&mut table, &mut events);

        // An unterminated fence runs to the end of input.
        if let Some(open) = fence {
            tracing::debug!(lines = open.lines.len(), "Closing unterminated fence at end of input");
            events.push(self.close_fence(open));
        }

        events
    }

    /// Classify a line that is not part of a fence or table run.
    fn classify_line(&self, line: &str) -> BlockEvent {
        if let Some((level, text)) = heading(line) {
            return BlockEvent::Heading {
                level,
                text: text.to_owned(),
            };
        }

        if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            return BlockEvent::BulletItem {
                text: text.to_owned(),
            };
        }

        if let Some(caps) = ORDERED_RE.captures(line)
            && let Ok(number) = caps[1].parse::<u64>()
        {
            return BlockEvent::OrderedItem {
                number,
                text: caps[2].to_owned(),
            };
        }

        if self.images
            && let Some(caps) = IMAGE_RE.captures(line.trim())
        {
            return BlockEvent::Image {
                path: PathBuf::from(&caps[2]),
                alt: caps[1].to_owned(),
            };
        }

        if line.trim().is_empty() {
            return BlockEvent::Blank;
        }

        BlockEvent::Paragraph {
            text: line.to_owned(),
        }
    }

    /// Turn a closed fence into its block event, rendering diagrams when possible.
    fn close_fence(&self, open: OpenFence) -> BlockEvent {
        if open.language.as_deref() != Some(DIAGRAM_LANGUAGE) {
            return BlockEvent::CodeBlock {
                language: open.language,
                lines: open.lines,
            };
        }

        let source = open.lines.join("\n");
        let Some((renderer, output_dir)) = self.diagrams else {
            return BlockEvent::DiagramBlock { source };
        };

        tracing::info!(chars = source.len(), "Rendering Mermaid diagram");
        match renderer.render(&source, output_dir) {
            Some(path) if path.exists() => BlockEvent::Diagram { path },
            Some(path) => {
                tracing::warn!(path = %path.display(), "Diagram renderer reported a missing image");
                BlockEvent::DiagramFallback { source }
            }
            None => {
                tracing::warn!("Diagram rendering failed, using source fallback");
                BlockEvent::DiagramFallback { source }
            }
        }
    }
}

/// Classify a document with default settings (no diagram rendering).
#[must_use]
pub fn classify(source: &str) -> Vec<BlockEvent> {
    Classifier::new().classify(source)
}

/// Parse `#`..`####` heading prefix.
fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=4).contains(&hashes) {
        return None;
    }
    let text = line[hashes..].strip_prefix(' ')?;
    // `hashes` is at most 4.
    #[allow(clippy::cast_possible_truncation)]
    Some((hashes as u8, text))
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Split a table line into trimmed cells, dropping the outer fragments.
pub(crate) fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = &trimmed[1..trimmed.len() - 1];
    inner.split('|').map(|cell| cell.trim().to_owned()).collect()
}

fn is_separator(cells: &[String]) -> bool {
    cells.iter().any(|cell| cell.contains('-'))
        && cells
            .iter()
            .all(|cell| cell.chars().all(|c| c == '-' || c == ':'))
}

/// Emit buffered table lines as a table, or as paragraphs when too short.
fn flush_table(buffer: &mut Vec<&str>, events: &mut Vec<BlockEvent>) {
    if buffer.is_empty() {
        return;
    }

    let rows: Vec<Vec<String>> = buffer.iter().map(|line| split_cells(line)).collect();
    let data_rows = rows.iter().filter(|cells| !is_separator(cells)).count();

    if data_rows < 2 {
        tracing::debug!(lines = buffer.len(), "Table run too short, treating as paragraphs");
        events.extend(buffer.iter().map(|line| BlockEvent::Paragraph {
            text: (*line).to_owned(),
        }));
    } else {
        events.extend(rows.into_iter().map(|cells| {
            if is_separator(&cells) {
                BlockEvent::TableSeparator
            } else {
                BlockEvent::TableRow { cells }
            }
        }));
    }

    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn para(text: &str) -> BlockEvent {
        BlockEvent::Paragraph {
            text: text.to_owned(),
        }
    }

    fn row(cells: &[&str]) -> BlockEvent {
        BlockEvent::TableRow {
            cells: cells.iter().map(|c| (*c).to_owned()).collect(),
        }
    }

    struct FailingRenderer;

    impl DiagramRenderer for FailingRenderer {
        fn render(&self, _source: &str, _output_dir: &Path) -> Option<PathBuf> {
            None
        }
    }

    /// Records sources and writes a placeholder file.
    struct RecordingRenderer {
        seen: Mutex<Vec<String>>,
    }

    impl DiagramRenderer for RecordingRenderer {
        fn render(&self, source: &str, output_dir: &Path) -> Option<PathBuf> {
            self.seen.lock().unwrap().push(source.to_owned());
            let path = output_dir.join("diagram.png");
            std::fs::write(&path, b"png").ok()?;
            Some(path)
        }
    }

    #[test]
    fn test_headings() {
        let events = classify("# One\n## Two\n### Three\n#### Four\n##### Five\n#NoSpace");
        assert_eq!(
            events,
            vec![
                BlockEvent::Heading { level: 1, text: "One".to_owned() },
                BlockEvent::Heading { level: 2, text: "Two".to_owned() },
                BlockEvent::Heading { level: 3, text: "Three".to_owned() },
                BlockEvent::Heading { level: 4, text: "Four".to_owned() },
                para("##### Five"),
                para("#NoSpace"),
            ]
        );
    }

    #[test]
    fn test_list_items() {
        let events = classify("- dash\n* star\n12. twelve\n3.no space");
        assert_eq!(
            events,
            vec![
                BlockEvent::BulletItem { text: "dash".to_owned() },
                BlockEvent::BulletItem { text: "star".to_owned() },
                BlockEvent::OrderedItem { number: 12, text: "twelve".to_owned() },
                para("3.no space"),
            ]
        );
    }

    #[test]
    fn test_blank_and_paragraph() {
        let events = classify("text  \n   \n\nmore");
        assert_eq!(
            events,
            vec![para("text"), BlockEvent::Blank, BlockEvent::Blank, para("more")]
        );
    }

    #[test]
    fn test_code_block() {
        let events = classify("```rust\nfn main() {}\n\n# not a heading\n```\nafter");
        assert_eq!(
            events,
            vec![
                BlockEvent::CodeBlock {
                    language: Some("rust".to_owned()),
                    lines: vec![
                        "fn main() {}".to_owned(),
                        String::new(),
                        "# not a heading".to_owned(),
                    ],
                },
                para("after"),
            ]
        );
    }

    #[test]
    fn test_code_block_without_language() {
        let events = classify("```\nx\n```");
        assert_eq!(
            events,
            vec![BlockEvent::CodeBlock {
                language: None,
                lines: vec!["x".to_owned()],
            }]
        );
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let events = classify("intro\n```python\nprint(1)\n- not a list\n| a | b |");
        assert_eq!(
            events,
            vec![
                para("intro"),
                BlockEvent::CodeBlock {
                    language: Some("python".to_owned()),
                    lines: vec![
                        "print(1)".to_owned(),
                        "- not a list".to_owned(),
                        "| a | b |".to_owned(),
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_closing_fence_must_be_bare() {
        let events = classify("```\n```js\n```");
        assert_eq!(
            events,
            vec![BlockEvent::CodeBlock {
                language: None,
                lines: vec!["```js".to_owned()],
            }]
        );
    }

    #[test]
    fn test_table_with_separator() {
        let events = classify("|A|B|\n|-|-|\n|1|2|");
        assert_eq!(
            events,
            vec![row(&["A", "B"]), BlockEvent::TableSeparator, row(&["1", "2"])]
        );
    }

    #[test]
    fn test_table_cells_trimmed_and_alignment_separator() {
        let events = classify("| Name | Value |\n| :--- | ---: |\n| a | 1 |\n| b | 2 |\nafter");
        assert_eq!(
            events,
            vec![
                row(&["Name", "Value"]),
                BlockEvent::TableSeparator,
                row(&["a", "1"]),
                row(&["b", "2"]),
                para("after"),
            ]
        );
    }

    #[test]
    fn test_lone_table_row_is_paragraph() {
        assert_eq!(classify("|A|B|"), vec![para("|A|B|")]);
    }

    #[test]
    fn test_header_and_separator_only_is_paragraphs() {
        assert_eq!(classify("|A|B|\n|-|-|"), vec![para("|A|B|"), para("|-|-|")]);
    }

    #[test]
    fn test_table_without_separator() {
        let events = classify("|A|B|\n|1|2|");
        assert_eq!(events, vec![row(&["A", "B"]), row(&["1", "2"])]);
    }

    #[test]
    fn test_table_ends_at_non_table_line() {
        let events = classify("|A|\n|1|\ntext\n|B|");
        assert_eq!(events, vec![row(&["A"]), row(&["1"]), para("text"), para("|B|")]);
    }

    #[test]
    fn test_image_line() {
        let events = classify("![Logo](img/logo.png)");
        assert_eq!(
            events,
            vec![BlockEvent::Image {
                path: PathBuf::from("img/logo.png"),
                alt: "Logo".to_owned(),
            }]
        );
    }

    #[test]
    fn test_image_with_diagram_alt_stays_an_image() {
        let events = classify("![Mermaid Diagram](x.png)");
        assert_eq!(
            events,
            vec![BlockEvent::Image {
                path: PathBuf::from("x.png"),
                alt: DIAGRAM_ALT.to_owned(),
            }]
        );
    }

    #[test]
    fn test_image_line_disabled() {
        let events = Classifier::new().with_images(false).classify("![Logo](logo.png)");
        assert_eq!(events, vec![para("![Logo](logo.png)")]);
    }

    #[test]
    fn test_diagram_without_renderer() {
        let events = classify("```mermaid\ngraph TD\nA-->B\n```");
        assert_eq!(
            events,
            vec![BlockEvent::DiagramBlock {
                source: "graph TD\nA-->B".to_owned(),
            }]
        );
    }

    #[test]
    fn test_diagram_render_failure_falls_back() {
        let renderer = FailingRenderer;
        let dir = Path::new("unused");
        let events = Classifier::new()
            .with_diagrams(&renderer, dir)
            .classify("```mermaid\ngraph TD\nA-->B\n```");
        assert_eq!(
            events,
            vec![BlockEvent::DiagramFallback {
                source: "graph TD\nA-->B".to_owned(),
            }]
        );
    }

    #[test]
    fn test_diagram_rendered_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer {
            seen: Mutex::new(Vec::new()),
        };
        let events = Classifier::new()
            .with_diagrams(&renderer, dir.path())
            .classify("before\n```mermaid\nsequenceDiagram\n```\nafter");

        assert_eq!(
            events,
            vec![
                para("before"),
                BlockEvent::Diagram {
                    path: dir.path().join("diagram.png"),
                },
                para("after"),
            ]
        );
        assert_eq!(*renderer.seen.lock().unwrap(), vec!["sequenceDiagram".to_owned()]);
    }

    #[test]
    fn test_unterminated_diagram_is_rendered() {
        let renderer = FailingRenderer;
        let events = Classifier::new()
            .with_diagrams(&renderer, Path::new("."))
            .classify("```mermaid\ngraph LR");
        assert_eq!(
            events,
            vec![BlockEvent::DiagramFallback {
                source: "graph LR".to_owned(),
            }]
        );
    }

    #[test]
    fn test_crlf_input() {
        let events = classify("# T\r\n\r\ntext\r\n");
        assert_eq!(
            events,
            vec![
                BlockEvent::Heading { level: 1, text: "T".to_owned() },
                BlockEvent::Blank,
                para("text"),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(classify("").is_empty());
    }

    #[test]
    fn test_file_structure_line() {
        assert!(is_file_structure_line("    src/main.rs"));
        assert!(is_file_structure_line("\tCargo.toml"));
        assert!(!is_file_structure_line("src/main.rs"));
        assert!(!is_file_structure_line("   "));
        assert!(!is_file_structure_line("  |-- tree"));
    }
}
