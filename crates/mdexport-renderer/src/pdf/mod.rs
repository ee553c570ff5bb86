//! PDF emitter.
//!
//! Block events become a story of flowables which [`layout`] places on A4
//! pages using the builtin Type1 fonts.

mod fonts;
mod layout;

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;

pub(crate) use fonts::Font;

use crate::classify::{DIAGRAM_ALT, is_file_structure_line};
use crate::decorator::{HeaderFooterConfig, PageDecorator, PageMargins, POINTS_PER_INCH};
use crate::emitter::{Emitter, Table, image_label};
use crate::error::RenderError;
use crate::inline::{InlineSpan, parse_inline};
use layout::{
    BLACK, Flowable, ImageBlock, PageGeometry, Paragraph, PdfImage, Preformatted, Rgb, Run,
    TableBlock,
};

/// Body text size and leading.
const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 12.0;

/// Code and file-tree text size and leading.
const CODE_SIZE: f32 = 9.0;
const CODE_LEADING: f32 = 11.0;

/// Left indent of list items, code and file-tree lines.
const INDENT: f32 = 20.0;

const CODE_BACKGROUND: Rgb = [211, 211, 211];
const LINK_COLOR: Rgb = [0, 0, 204];

/// Spacer after headings, code blocks and images.
const LARGE_GAP: f32 = 12.0;
/// Spacer after paragraphs and blank lines.
const SMALL_GAP: f32 = 6.0;

/// Placed diagram size.
const IMAGE_WIDTH: f32 = 6.0 * POINTS_PER_INCH;
const IMAGE_HEIGHT: f32 = 4.0 * POINTS_PER_INCH;

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 18.0,
        2 => 16.0,
        3 => 14.0,
        _ => 12.0,
    }
}

/// Convert inline markup to styled runs on a base weight.
fn runs(text: &str, bold: bool) -> Vec<Run> {
    parse_inline(text)
        .into_iter()
        .map(|span| {
            let (font, color) = match span {
                InlineSpan::Text(_) => (Font::styled(bold, false), BLACK),
                InlineSpan::Bold(_) => (Font::styled(true, false), BLACK),
                InlineSpan::Italic(_) => (Font::styled(bold, true), BLACK),
                InlineSpan::Code(_) => (Font::Courier, BLACK),
                InlineSpan::Link { .. } => (Font::styled(bold, false), LINK_COLOR),
            };
            Run {
                text: span.text().to_owned(),
                font,
                color,
            }
        })
        .collect()
}

/// Decode an image file into compressed RGB samples, flattening alpha onto white.
fn load_image(path: &Path) -> Result<PdfImage, RenderError> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut samples = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha)) / 255;
            samples.push(u8::try_from(blended).unwrap_or(u8::MAX));
        }
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&samples)?;
    Ok(PdfImage {
        width,
        height,
        data: encoder.finish()?,
    })
}

/// PDF document builder.
pub struct PdfEmitter {
    story: Vec<Flowable>,
    images: Vec<PdfImage>,
    header_footer: Option<HeaderFooterConfig>,
}

impl Default for PdfEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfEmitter {
    /// Create an emitter without header/footer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            story: Vec::new(),
            images: Vec::new(),
            header_footer: None,
        }
    }

    /// Decorate every page with a header and footer.
    #[must_use]
    pub fn with_header_footer(mut self, config: Option<HeaderFooterConfig>) -> Self {
        self.header_footer = config;
        self
    }

    fn push_paragraph(&mut self, runs: Vec<Run>, size: f32, indent: f32) {
        self.story.push(Flowable::Paragraph(Paragraph {
            runs,
            size,
            leading: size * 1.2,
            indent,
        }));
    }

    fn push_code(&mut self, lines: Vec<String>) {
        self.story.push(Flowable::Preformatted(Preformatted {
            lines,
            size: CODE_SIZE,
            leading: CODE_LEADING,
            left_indent: INDENT,
            right_indent: INDENT,
            background: Some(CODE_BACKGROUND),
        }));
        self.story.push(Flowable::Spacer(LARGE_GAP));
    }

    fn push_placeholder(&mut self, label: &str, note: &str) {
        let label = Run {
            text: label.to_owned(),
            font: Font::HelveticaBold,
            color: BLACK,
        };
        self.push_paragraph(vec![label], BODY_SIZE, 0.0);
        self.story.push(Flowable::Spacer(SMALL_GAP));
        self.push_paragraph(runs(&format!("*{note}*"), false), BODY_SIZE, 0.0);
        self.story.push(Flowable::Spacer(SMALL_GAP));
    }

    fn push_image(&mut self, path: &Path) -> Result<(), RenderError> {
        let image = load_image(path)?;
        let index = self.images.len();
        self.images.push(image);
        self.story.push(Flowable::Image(ImageBlock {
            index,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
        }));
        self.story.push(Flowable::Spacer(LARGE_GAP));
        Ok(())
    }
}

impl Emitter for PdfEmitter {
    const EXTENSION: &'static str = "pdf";
    const MIME_TYPE: &'static str = "application/pdf";

    fn heading(&mut self, level: u8, text: &str) {
        self.push_paragraph(runs(text, true), heading_size(level), 0.0);
        self.story.push(Flowable::Spacer(LARGE_GAP));
    }

    fn bullet_item(&mut self, text: &str) {
        let mut item = vec![Run {
            text: "\u{2022} ".to_owned(),
            font: Font::Helvetica,
            color: BLACK,
        }];
        item.extend(runs(text, false));
        self.push_paragraph(item, BODY_SIZE, INDENT);
    }

    fn ordered_item(&mut self, number: u64, text: &str) {
        let mut item = vec![Run {
            text: format!("{number}. "),
            font: Font::Helvetica,
            color: BLACK,
        }];
        item.extend(runs(text, false));
        self.push_paragraph(item, BODY_SIZE, INDENT);
    }

    fn table(&mut self, table: &Table<'_>) {
        self.story.push(Flowable::Table(TableBlock {
            rows: table.rows.iter().map(|row| row.to_vec()).collect(),
            columns: table.columns(),
            has_header: table.has_header,
            size: BODY_SIZE,
            leading: BODY_LEADING,
        }));
        self.story.push(Flowable::Spacer(LARGE_GAP));
    }

    fn code_block(&mut self, _language: Option<&str>, lines: &[String]) {
        // Empty blocks produce nothing, matching an empty collection.
        if !lines.is_empty() {
            self.push_code(lines.to_vec());
        }
    }

    fn diagram(&mut self, path: &Path) {
        if let Err(e) = self.push_image(path) {
            tracing::error!(path = %path.display(), error = %e, "Error adding diagram to PDF");
            self.push_placeholder(
                &format!("[{DIAGRAM_ALT}]"),
                "Image could not be added to PDF.",
            );
        }
    }

    fn image(&mut self, path: &Path, alt: &str) {
        if let Err(e) = self.push_image(path) {
            tracing::error!(path = %path.display(), error = %e, "Error adding image to PDF");
            self.push_placeholder(&image_label(alt), "Image could not be added to PDF.");
        }
    }

    fn diagram_fallback(&mut self, source: &str) {
        self.push_placeholder(&format!("[{DIAGRAM_ALT}]"), "Failed to render diagram.");
        self.push_code(source.split('\n').map(str::to_owned).collect());
    }

    fn blank(&mut self) {
        self.story.push(Flowable::Spacer(SMALL_GAP));
    }

    fn paragraph(&mut self, text: &str) {
        if is_file_structure_line(text) {
            self.story.push(Flowable::Preformatted(Preformatted {
                lines: vec![text.to_owned()],
                size: CODE_SIZE,
                leading: CODE_LEADING,
                left_indent: INDENT,
                right_indent: 0.0,
                background: None,
            }));
            return;
        }
        let runs = runs(text, false);
        if runs.iter().all(|run| run.text.trim().is_empty()) {
            return;
        }
        self.push_paragraph(runs, BODY_SIZE, 0.0);
        self.story.push(Flowable::Spacer(SMALL_GAP));
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let decorator = self
            .header_footer
            .as_ref()
            .and_then(|config| match PageDecorator::new(config) {
                Ok(decorator) => Some(decorator),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping PDF header/footer");
                    None
                }
            });
        let margins = self
            .header_footer
            .as_ref()
            .map_or_else(PageMargins::default, |config| *config.page_margins());

        Ok(layout::render(
            &self.story,
            &self.images,
            PageGeometry::a4(&margins),
            decorator.as_ref(),
        ))
    }
}
