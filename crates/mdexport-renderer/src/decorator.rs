//! Header and footer decoration for Word and PDF output.
//!
//! [`HeaderFooterConfig`] is a read-only value with per-field defaults. The
//! Word emitter turns it into `header1.xml`/`footer1.xml` parts; the PDF
//! emitter calls [`PageDecorator::decorate`] once for every laid-out page.
//! Invalid settings are reported as [`DecorationError`] when the decorator is
//! built, so drawing itself cannot fail.

use std::fmt::Write;

use crate::error::DecorationError;
use crate::pdf::Font;
use crate::util::escape_xml;

/// Points per inch.
pub(crate) const POINTS_PER_INCH: f32 = 72.0;

/// Twentieths of a point per inch (OOXML page geometry unit).
const TWIPS_PER_INCH: f32 = 1440.0;

/// Horizontal alignment of header/footer text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    /// Flush left at the left margin.
    Left,
    /// Centered on the page.
    #[default]
    Center,
    /// Flush right at the right margin.
    Right,
}

impl Alignment {
    /// Parse `left`, `center` or `right` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "center" | "centre" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    fn ooxml(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Text and font settings for a header or footer line.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderFooterStyle {
    /// Text to display.
    pub text: String,
    /// Font family name (e.g. "Arial").
    pub font_name: String,
    /// Font size in points.
    pub font_size: f32,
    /// Horizontal alignment.
    pub alignment: Alignment,
    /// Text color as `#rrggbb`.
    pub color: String,
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
}

impl HeaderFooterStyle {
    /// Built-in header settings.
    #[must_use]
    pub fn default_header() -> Self {
        Self {
            text: "GoAGI".to_owned(),
            font_name: "Arial".to_owned(),
            font_size: 10.0,
            alignment: Alignment::Center,
            color: "#333333".to_owned(),
            bold: false,
            italic: false,
        }
    }

    /// Built-in footer settings.
    #[must_use]
    pub fn default_footer() -> Self {
        Self {
            text: "Copyright (c) 2025 GoAGI All rights reserved.".to_owned(),
            font_name: "Arial".to_owned(),
            font_size: 9.0,
            alignment: Alignment::Center,
            color: "#666666".to_owned(),
            bold: false,
            italic: false,
        }
    }

    /// Check font size and color, returning the parsed RGB color.
    pub fn validate(&self) -> Result<[u8; 3], DecorationError> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(DecorationError::InvalidFontSize(self.font_size));
        }
        parse_color(&self.color)
    }
}

/// Page margins and header/footer distances, in inches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    /// Top margin.
    pub top: f32,
    /// Bottom margin.
    pub bottom: f32,
    /// Left margin.
    pub left: f32,
    /// Right margin.
    pub right: f32,
    /// Distance from the top edge to the header.
    pub header_distance: f32,
    /// Distance from the bottom edge to the footer.
    pub footer_distance: f32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top: 1.0,
            bottom: 1.0,
            left: 1.0,
            right: 1.0,
            header_distance: 0.5,
            footer_distance: 0.5,
        }
    }
}

/// Header/footer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderFooterConfig {
    /// Header settings.
    pub header: HeaderFooterStyle,
    /// Footer settings.
    pub footer: HeaderFooterStyle,
    /// Page margins.
    pub page: PageMargins,
}

impl Default for HeaderFooterConfig {
    fn default() -> Self {
        Self {
            header: HeaderFooterStyle::default_header(),
            footer: HeaderFooterStyle::default_footer(),
            page: PageMargins::default(),
        }
    }
}

impl HeaderFooterConfig {
    /// Header settings.
    #[must_use]
    pub fn header(&self) -> &HeaderFooterStyle {
        &self.header
    }

    /// Footer settings.
    #[must_use]
    pub fn footer(&self) -> &HeaderFooterStyle {
        &self.footer
    }

    /// Page margins.
    #[must_use]
    pub fn page_margins(&self) -> &PageMargins {
        &self.page
    }
}

/// Parse a `#rrggbb` color.
pub(crate) fn parse_color(value: &str) -> Result<[u8; 3], DecorationError> {
    let invalid = || DecorationError::InvalidColor(value.to_owned());
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Word header and footer parts built from a validated configuration.
pub(crate) struct WordDecoration {
    /// `word/header1.xml` content.
    pub(crate) header_xml: String,
    /// `word/footer1.xml` content.
    pub(crate) footer_xml: String,
}

impl WordDecoration {
    /// Build header and footer parts.
    pub(crate) fn new(config: &HeaderFooterConfig) -> Result<Self, DecorationError> {
        Ok(Self {
            header_xml: word_part("w:hdr", &config.header)?,
            footer_xml: word_part("w:ftr", &config.footer)?,
        })
    }
}

/// Build a header (`w:hdr`) or footer (`w:ftr`) part with one paragraph.
fn word_part(root: &str, style: &HeaderFooterStyle) -> Result<String, DecorationError> {
    let [r, g, b] = style.validate()?;

    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(
        xml,
        r#"<{root} xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#
    )
    .unwrap();
    write!(
        xml,
        r#"<w:p><w:pPr><w:jc w:val="{}"/></w:pPr><w:r><w:rPr>"#,
        style.alignment.ooxml()
    )
    .unwrap();
    let font = escape_xml(&style.font_name);
    write!(xml, r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#).unwrap();
    if style.bold {
        xml.push_str("<w:b/>");
    }
    if style.italic {
        xml.push_str("<w:i/>");
    }
    write!(xml, r#"<w:color w:val="{r:02X}{g:02X}{b:02X}"/>"#).unwrap();
    let half_points = half_points(style.font_size);
    write!(xml, r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#).unwrap();
    write!(
        xml,
        r#"</w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p></{root}>"#,
        escape_xml(&style.text)
    )
    .unwrap();
    Ok(xml)
}

/// Font size in OOXML half-points.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn half_points(size: f32) -> u32 {
    (size * 2.0).round().max(1.0) as u32
}

/// A4 width in twips.
const A4_WIDTH_TWIPS: u32 = 11906;
/// A4 height in twips.
const A4_HEIGHT_TWIPS: u32 = 16838;

/// Section properties with page geometry and optional header/footer references.
pub(crate) fn word_section_properties(margins: &PageMargins, decorated: bool) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let twips = |inches: f32| (inches * TWIPS_PER_INCH).round().max(0.0) as u32;

    let mut xml = String::from("<w:sectPr>");
    if decorated {
        xml.push_str(r#"<w:headerReference w:type="default" r:id="rIdHeader1"/>"#);
        xml.push_str(r#"<w:footerReference w:type="default" r:id="rIdFooter1"/>"#);
    }
    write!(
        xml,
        r#"<w:pgSz w:w="{A4_WIDTH_TWIPS}" w:h="{A4_HEIGHT_TWIPS}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="{}" w:footer="{}" w:gutter="0"/>"#,
        twips(margins.top),
        twips(margins.right),
        twips(margins.bottom),
        twips(margins.left),
        twips(margins.header_distance),
        twips(margins.footer_distance),
    )
    .unwrap();
    xml.push_str("</w:sectPr>");
    xml
}

/// Page dimensions in points.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PageFrame {
    pub(crate) width: f32,
    pub(crate) height: f32,
}

/// Drawing surface the PDF backend exposes to the decorator.
pub(crate) trait PageCanvas {
    /// Width of `text` set in `font` at `size` points.
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32;

    /// Draw a single line of text with its baseline at (`x`, `y`).
    fn draw_text(&mut self, x: f32, y: f32, font: Font, size: f32, color: [u8; 3], text: &str);
}

/// Resolved drawing settings for one header/footer line.
struct Line<'a> {
    style: &'a HeaderFooterStyle,
    font: Font,
    color: [u8; 3],
}

/// Per-page header/footer painter for the PDF backend.
pub(crate) struct PageDecorator<'a> {
    header: Line<'a>,
    footer: Line<'a>,
    margins: PageMargins,
}

impl<'a> PageDecorator<'a> {
    /// Validate the configuration and prepare fonts and colors.
    pub(crate) fn new(config: &'a HeaderFooterConfig) -> Result<Self, DecorationError> {
        let line = |style: &'a HeaderFooterStyle| -> Result<Line<'a>, DecorationError> {
            Ok(Line {
                color: style.validate()?,
                font: Font::for_family(&style.font_name, style.bold, style.italic),
                style,
            })
        };
        Ok(Self {
            header: line(&config.header)?,
            footer: line(&config.footer)?,
            margins: config.page,
        })
    }

    /// Draw the header and footer on one page.
    pub(crate) fn decorate(&self, canvas: &mut dyn PageCanvas, frame: PageFrame) {
        let offset = 0.2 * POINTS_PER_INCH;
        let header_y = frame.height - self.margins.top * POINTS_PER_INCH + offset;
        let footer_y = self.margins.bottom * POINTS_PER_INCH - offset;

        self.draw_line(canvas, frame, &self.header, header_y);
        self.draw_line(canvas, frame, &self.footer, footer_y);
    }

    fn draw_line(&self, canvas: &mut dyn PageCanvas, frame: PageFrame, line: &Line<'_>, y: f32) {
        let text = line.style.text.as_str();
        if text.is_empty() {
            return;
        }
        let size = line.style.font_size;
        let width = canvas.text_width(text, line.font, size);
        let x = match line.style.alignment {
            Alignment::Left => self.margins.left * POINTS_PER_INCH,
            Alignment::Center => (frame.width - width) / 2.0,
            Alignment::Right => frame.width - self.margins.right * POINTS_PER_INCH - width,
        };
        canvas.draw_text(x, y, line.font, size, line.color, text);
    }
}
