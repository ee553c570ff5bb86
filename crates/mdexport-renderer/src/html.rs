//! HTML emitter.
//!
//! Produces a standalone page with an inline stylesheet. Inline markup is
//! turned into tags; other text is written as-is, so raw HTML in the source
//! passes through.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use uuid::Uuid;

use crate::classify::{DIAGRAM_ALT, is_file_structure_line};
use crate::emitter::{Emitter, Table};
use crate::error::RenderError;
use crate::inline::{InlineMode, format_inline};
use crate::util::escape_html;

const STYLESHEET: &str = r#"        body { font-family: Arial, sans-serif; line-height: 1.6; margin: 40px; }
        h1, h2, h3, h4 { color: #333; }
        h1 { border-bottom: 2px solid #eee; padding-bottom: 10px; }
        h2 { border-bottom: 1px solid #eee; padding-bottom: 5px; }
        code { background-color: #f4f4f4; padding: 2px 4px; border-radius: 3px; font-family: "Courier New", monospace; }
        pre { background-color: #f4f4f4; padding: 15px; border-radius: 5px; overflow-x: auto; }
        pre code { background-color: transparent; padding: 0; }
        ul, ol { padding-left: 20px; }
        li { margin: 5px 0; }
        a { color: #007acc; text-decoration: none; }
        a:hover { text-decoration: underline; }
        .file-structure { font-family: "Courier New", monospace; background-color: #f9f9f9; padding: 10px; border-radius: 5px; }
        img { max-width: 100%; height: auto; }
        table { border-collapse: collapse; margin: 10px 0; }
        th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
        th { background-color: #f4f4f4; }"#;

const FAILURE_STYLE: &str = "background-color: #f5f5f5; padding: 15px; border: 1px solid #ddd; border-radius: 5px; margin: 10px 0;";

/// Directory beside the output file that receives copied diagram images.
pub const IMAGES_DIR: &str = "images";

/// HTML document builder.
pub struct HtmlEmitter {
    lines: Vec<String>,
    /// Where diagram images are copied; `None` embeds them as data URIs.
    output_dir: Option<PathBuf>,
}

impl HtmlEmitter {
    /// Create an emitter whose diagram images are copied under `output_dir/images`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            lines: Vec::new(),
            output_dir: Some(output_dir.into()),
        }
    }

    /// Create an emitter for a page that is not written next to its images.
    ///
    /// Diagrams are embedded as `data:image/png;base64,...` URIs.
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            lines: Vec::new(),
            output_dir: None,
        }
    }

    /// Image source for a rendered diagram: a copy next to the output or a data URI.
    fn diagram_src(&self, path: &Path) -> Result<String, RenderError> {
        let Some(output_dir) = &self.output_dir else {
            let data = std::fs::read(path)?;
            return Ok(format!("data:image/png;base64,{}", BASE64_STANDARD.encode(data)));
        };

        let images = output_dir.join(IMAGES_DIR);
        std::fs::create_dir_all(&images)?;

        let id = Uuid::new_v4().simple().to_string();
        let name = format!("diagram_{}.png", &id[..8]);
        std::fs::copy(path, images.join(&name))?;
        Ok(format!("{IMAGES_DIR}/{name}"))
    }

    fn failure_block(&mut self, label: &str, source: &str) {
        self.lines.push(format!(
            r#"<div style="{FAILURE_STYLE}"><p><strong>{label}:</strong></p><pre><code>{source}</code></pre></div>"#
        ));
    }
}

impl Emitter for HtmlEmitter {
    const EXTENSION: &'static str = "html";
    const MIME_TYPE: &'static str = "text/html";

    fn heading(&mut self, level: u8, text: &str) {
        let text = format_inline(text, InlineMode::Markup);
        self.lines.push(format!("<h{level}>{text}</h{level}>"));
    }

    fn bullet_item(&mut self, text: &str) {
        let text = format_inline(text, InlineMode::Markup);
        self.lines.push(format!("<li>{text}</li>"));
    }

    fn ordered_item(&mut self, _number: u64, text: &str) {
        let text = format_inline(text, InlineMode::Markup);
        self.lines.push(format!("<li>{text}</li>"));
    }

    fn table(&mut self, table: &Table<'_>) {
        let columns = table.columns();
        let mut html = String::from("<table>");
        for (i, row) in table.rows.iter().enumerate() {
            let tag = if table.has_header && i == 0 { "th" } else { "td" };
            html.push_str("<tr>");
            for col in 0..columns {
                let cell = row.get(col).map_or("", String::as_str);
                write!(html, "<{tag}>{}</{tag}>", format_inline(cell, InlineMode::Markup)).unwrap();
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        self.lines.push(html);
    }

    fn code_block(&mut self, _language: Option<&str>, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.lines.push("<pre><code>".to_owned());
        self.lines.extend(lines.iter().cloned());
        self.lines.push("</code></pre>".to_owned());
    }

    fn diagram(&mut self, path: &Path) {
        match self.diagram_src(path) {
            Ok(src) => self.lines.push(format!(
                r#"<img src="{src}" alt="{DIAGRAM_ALT}" style="max-width: 100%; height: auto;">"#
            )),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error copying diagram image");
                self.failure_block("Mermaid Diagram (Error)", "");
            }
        }
    }

    fn image(&mut self, path: &Path, alt: &str) {
        self.lines.push(format!(
            r#"<img src="{}" alt="{}">"#,
            escape_html(&path.to_string_lossy()),
            escape_html(alt)
        ));
    }

    fn diagram_fallback(&mut self, source: &str) {
        self.failure_block("Mermaid Diagram (Rendering Failed)", source);
    }

    fn blank(&mut self) {
        self.lines.push("<br>".to_owned());
    }

    fn paragraph(&mut self, text: &str) {
        let formatted = format_inline(text, InlineMode::Markup);
        if is_file_structure_line(text) {
            self.lines
                .push(format!(r#"<div class="file-structure">{formatted}</div>"#));
        } else if !formatted.trim().is_empty() {
            self.lines.push(format!("<p>{formatted}</p>"));
        }
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let mut html = String::with_capacity(1024 + self.lines.iter().map(String::len).sum::<usize>());
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str("    <title>Markdown Export</title>\n    <style>\n");
        html.push_str(STYLESHEET);
        html.push_str("\n    </style>\n</head>\n<body>\n");
        for line in &self.lines {
            html.push_str(line);
            html.push('\n');
        }
        html.push_str("</body>\n</html>");
        Ok(html.into_bytes())
    }
}
