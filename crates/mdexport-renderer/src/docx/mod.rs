//! Word (`.docx`) emitter.
//!
//! Builds `word/document.xml` directly as a string. Inline markup is reduced
//! to plain text; headings, lists, tables, code and images use native
//! WordprocessingML constructs.

mod package;

use std::fmt::Write as _;
use std::path::Path;

use crate::classify::DIAGRAM_ALT;
use crate::decorator::{
    Alignment, HeaderFooterConfig, PageMargins, WordDecoration, word_section_properties,
};
use crate::emitter::{Emitter, Table, image_label};
use crate::error::RenderError;
use crate::inline::{InlineMode, format_inline};
use crate::util::escape_xml;

use package::{BULLET_NUM_ID, MediaPart, NS_A, NS_PIC, NS_R, NS_W, NS_WP, OrderedList, PackageParts};

/// Rendered width of embedded diagrams, in points.
const DIAGRAM_WIDTH_PT: f32 = 400.0;
/// Rendered width of standalone images, in points.
const IMAGE_WIDTH_PT: f32 = 432.0;
/// English Metric Units per point.
const EMU_PER_PT: f32 = 12_700.0;

/// Code block font.
const CODE_FONT: &str = "Courier New";
/// Code block size in half-points (10pt).
const CODE_SIZE: u32 = 20;

/// Heading style and explicit size in half-points for each level.
fn heading_style(level: u8) -> (&'static str, u32) {
    match level {
        1 => ("Heading1", 32),
        2 => ("Heading2", 28),
        _ => ("Heading3", 24),
    }
}

/// Run formatting.
#[derive(Clone, Copy, Default)]
struct RunProps<'a> {
    bold: bool,
    italic: bool,
    font: Option<&'a str>,
    size: Option<u32>,
}

impl RunProps<'_> {
    fn write(&self, xml: &mut String) {
        if !self.bold && !self.italic && self.font.is_none() && self.size.is_none() {
            return;
        }
        xml.push_str("<w:rPr>");
        if let Some(font) = self.font {
            write!(xml, r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#).unwrap();
        }
        if self.bold {
            xml.push_str("<w:b/>");
        }
        if self.italic {
            xml.push_str("<w:i/>");
        }
        if let Some(size) = self.size {
            write!(xml, r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#).unwrap();
        }
        xml.push_str("</w:rPr>");
    }
}

/// Word document builder.
pub struct DocxEmitter {
    body: String,
    media: Vec<MediaPart>,
    ordered_lists: Vec<OrderedList>,
    current_list: Option<u32>,
    header_footer: Option<HeaderFooterConfig>,
    table_alignment: Alignment,
    next_drawing_id: u32,
}

impl Default for DocxEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxEmitter {
    /// Create an emitter without header/footer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            body: String::with_capacity(4096),
            media: Vec::new(),
            ordered_lists: Vec::new(),
            current_list: None,
            header_footer: None,
            table_alignment: Alignment::Left,
            next_drawing_id: 1,
        }
    }

    /// Apply a header/footer configuration.
    #[must_use]
    pub fn with_header_footer(mut self, config: Option<HeaderFooterConfig>) -> Self {
        self.header_footer = config;
        self
    }

    /// Set table alignment on the page.
    #[must_use]
    pub fn with_table_alignment(mut self, alignment: Alignment) -> Self {
        self.table_alignment = alignment;
        self
    }

    /// Append a paragraph of one run.
    fn push_paragraph(&mut self, style: Option<&str>, text: &str, props: RunProps<'_>) {
        self.body.push_str("<w:p>");
        if let Some(style) = style {
            write!(self.body, r#"<w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#).unwrap();
        }
        if !text.is_empty() {
            push_run(&mut self.body, text, props);
        }
        self.body.push_str("</w:p>");
    }

    /// Append a monospaced paragraph with one run per line.
    fn push_code(&mut self, lines: &[String]) {
        let props = RunProps {
            font: Some(CODE_FONT),
            size: Some(CODE_SIZE),
            ..RunProps::default()
        };
        self.body
            .push_str(r#"<w:p><w:pPr><w:pStyle w:val="NoSpacing"/></w:pPr>"#);
        for (i, line) in lines.iter().enumerate() {
            self.body.push_str("<w:r>");
            props.write(&mut self.body);
            if i > 0 {
                self.body.push_str("<w:br/>");
            }
            write!(
                self.body,
                r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
                escape_xml(line)
            )
            .unwrap();
        }
        self.body.push_str("</w:p>");
    }

    /// Bold label with an italic note underneath.
    fn push_placeholder(&mut self, label: &str, note: &str) {
        self.push_paragraph(
            None,
            label,
            RunProps {
                bold: true,
                ..RunProps::default()
            },
        );
        self.push_paragraph(
            None,
            note,
            RunProps {
                italic: true,
                ..RunProps::default()
            },
        );
    }

    /// Store the image in the package and append an inline drawing.
    fn embed_image(&mut self, path: &Path, width_pt: f32) -> Result<(), RenderError> {
        let (px_width, px_height) = image::image_dimensions(path)?;
        let data = std::fs::read(path)?;

        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or_else(|| "png".to_owned(), str::to_ascii_lowercase);
        let index = self.media.len() + 1;
        let rel_id = format!("rIdImage{index}");
        let file_name = format!("image{index}.{ext}");

        #[allow(clippy::cast_precision_loss)]
        let aspect = if px_width == 0 {
            1.0
        } else {
            px_height as f32 / px_width as f32
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cx = (width_pt * EMU_PER_PT).round() as u64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cy = (width_pt * aspect * EMU_PER_PT).round() as u64;

        let id = self.next_drawing_id;
        self.next_drawing_id += 1;
        let name = escape_xml(&file_name);

        write!(
            self.body,
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{id}" name="Picture {id}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{NS_PIC}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
        )
        .unwrap();

        self.media.push(MediaPart {
            rel_id,
            file_name,
            data,
        });
        Ok(())
    }
}

fn push_run(xml: &mut String, text: &str, props: RunProps<'_>) {
    xml.push_str("<w:r>");
    props.write(xml);
    write!(xml, r#"<w:t xml:space="preserve">{}</w:t></w:r>"#, escape_xml(text)).unwrap();
}

impl Emitter for DocxEmitter {
    const EXTENSION: &'static str = "docx";
    const MIME_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    fn heading(&mut self, level: u8, text: &str) {
        self.current_list = None;
        let (style, size) = heading_style(level);
        self.push_paragraph(
            Some(style),
            &format_inline(text, InlineMode::Plain),
            RunProps {
                size: Some(size),
                ..RunProps::default()
            },
        );
    }

    fn bullet_item(&mut self, text: &str) {
        self.current_list = None;
        write!(
            self.body,
            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{BULLET_NUM_ID}"/></w:numPr></w:pPr>"#
        )
        .unwrap();
        push_run(
            &mut self.body,
            &format_inline(text, InlineMode::Plain),
            RunProps::default(),
        );
        self.body.push_str("</w:p>");
    }

    fn ordered_item(&mut self, number: u64, text: &str) {
        // A new numbering instance starts a fresh list at the source number.
        let num_id = match self.current_list {
            Some(num_id) if number != 1 => num_id,
            _ => {
                let num_id = BULLET_NUM_ID + 1 + u32::try_from(self.ordered_lists.len()).unwrap_or(0);
                self.ordered_lists.push(OrderedList {
                    num_id,
                    start: number,
                });
                self.current_list = Some(num_id);
                num_id
            }
        };
        write!(
            self.body,
            r#"<w:p><w:pPr><w:pStyle w:val="ListNumber"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr>"#
        )
        .unwrap();
        push_run(
            &mut self.body,
            &format_inline(text, InlineMode::Plain),
            RunProps::default(),
        );
        self.body.push_str("</w:p>");
    }

    fn table(&mut self, table: &Table<'_>) {
        self.current_list = None;
        let columns = table.columns();
        let jc = match self.table_alignment {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        };
        write!(
            self.body,
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/><w:jc w:val="{jc}"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#
        )
        .unwrap();
        let col_width = 9000 / columns.max(1);
        for _ in 0..columns {
            write!(self.body, r#"<w:gridCol w:w="{col_width}"/>"#).unwrap();
        }
        self.body.push_str("</w:tblGrid>");

        for (i, row) in table.rows.iter().enumerate() {
            self.body.push_str("<w:tr>");
            for col in 0..columns {
                let cell = row.get(col).map_or("", String::as_str);
                write!(
                    self.body,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{col_width}" w:type="dxa"/></w:tcPr><w:p><w:pPr><w:jc w:val="left"/></w:pPr>"#
                )
                .unwrap();
                if !cell.is_empty() {
                    push_run(
                        &mut self.body,
                        cell,
                        RunProps {
                            bold: table.has_header && i == 0,
                            ..RunProps::default()
                        },
                    );
                }
                self.body.push_str("</w:p></w:tc>");
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
    }

    fn code_block(&mut self, _language: Option<&str>, lines: &[String]) {
        self.current_list = None;
        self.push_code(lines);
    }

    fn diagram(&mut self, path: &Path) {
        self.current_list = None;
        match self.embed_image(path, DIAGRAM_WIDTH_PT) {
            Ok(()) => self.push_paragraph(None, "", RunProps::default()),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error adding diagram to Word");
                self.push_placeholder(
                    &format!("[{DIAGRAM_ALT}]"),
                    "Image could not be added to Word.",
                );
            }
        }
    }

    fn image(&mut self, path: &Path, alt: &str) {
        self.current_list = None;
        match self.embed_image(path, IMAGE_WIDTH_PT) {
            Ok(()) if alt.is_empty() => self.push_paragraph(None, "", RunProps::default()),
            Ok(()) => self.push_paragraph(Some("Caption"), alt, RunProps::default()),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error adding image to Word");
                self.push_placeholder(&image_label(alt), "Image could not be added to Word.");
            }
        }
    }

    fn diagram_fallback(&mut self, source: &str) {
        self.current_list = None;
        self.push_placeholder(&format!("[{DIAGRAM_ALT}]"), "Failed to render diagram.");
        let lines: Vec<String> = source.split('\n').map(str::to_owned).collect();
        self.push_code(&lines);
    }

    fn blank(&mut self) {
        self.push_paragraph(None, "", RunProps::default());
    }

    fn paragraph(&mut self, text: &str) {
        self.current_list = None;
        let text = format_inline(text, InlineMode::Plain);
        if !text.trim().is_empty() {
            self.push_paragraph(None, &text, RunProps::default());
        }
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let decoration = self
            .header_footer
            .as_ref()
            .and_then(|config| match WordDecoration::new(config) {
                Ok(parts) => Some(parts),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping Word header/footer");
                    None
                }
            });

        let margins = self
            .header_footer
            .as_ref()
            .map_or_else(PageMargins::default, |config| *config.page_margins());

        let mut document_xml = String::with_capacity(self.body.len() + 1024);
        document_xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(
            document_xml,
            r#"<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:wp="{NS_WP}" xmlns:a="{NS_A}" xmlns:pic="{NS_PIC}"><w:body>"#
        )
        .unwrap();
        document_xml.push_str(&self.body);
        document_xml.push_str(&word_section_properties(&margins, decoration.is_some()));
        document_xml.push_str("</w:body></w:document>");

        package::assemble(&PackageParts {
            document_xml,
            header_xml: decoration.as_ref().map(|d| d.header_xml.as_str()),
            footer_xml: decoration.as_ref().map(|d| d.footer_xml.as_str()),
            media: &self.media,
            ordered_lists: &self.ordered_lists,
        })
    }
}
