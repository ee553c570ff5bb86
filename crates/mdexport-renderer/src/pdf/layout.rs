//! Story layout and PDF serialization.
//!
//! Flowables are placed top to bottom inside the page frame. When the next
//! line or block does not fit, the current page is closed, decorated and a
//! new one is started. Paragraphs and preformatted blocks split across pages
//! at line boundaries; images and table rows move to the next page whole.

use std::mem;

use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};

use super::fonts::{Font, encode};
use crate::decorator::{POINTS_PER_INCH, PageCanvas, PageDecorator, PageFrame, PageMargins};

/// A4 width in points.
pub(crate) const A4_WIDTH: f32 = 595.276;
/// A4 height in points.
pub(crate) const A4_HEIGHT: f32 = 841.89;

/// Inner padding of preformatted backgrounds and table cells.
const PADDING: f32 = 4.0;

/// Text color.
pub(crate) type Rgb = [u8; 3];

pub(crate) const BLACK: Rgb = [0, 0, 0];

/// A styled text fragment.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Run {
    pub(crate) text: String,
    pub(crate) font: Font,
    pub(crate) color: Rgb,
}

/// Wrapped paragraph text.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Paragraph {
    pub(crate) runs: Vec<Run>,
    pub(crate) size: f32,
    pub(crate) leading: f32,
    pub(crate) indent: f32,
}

/// Monospaced block drawn line for line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Preformatted {
    pub(crate) lines: Vec<String>,
    pub(crate) size: f32,
    pub(crate) leading: f32,
    pub(crate) left_indent: f32,
    pub(crate) right_indent: f32,
    pub(crate) background: Option<Rgb>,
}

/// Grid of wrapped cells.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TableBlock {
    pub(crate) rows: Vec<Vec<String>>,
    pub(crate) columns: usize,
    pub(crate) has_header: bool,
    pub(crate) size: f32,
    pub(crate) leading: f32,
}

/// Placed image XObject.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ImageBlock {
    /// Index into the document image list.
    pub(crate) index: usize,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

/// Element of the document story.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Flowable {
    Paragraph(Paragraph),
    Preformatted(Preformatted),
    Table(TableBlock),
    Image(ImageBlock),
    Spacer(f32),
}

/// Decoded raster image, zlib-compressed RGB samples.
pub(crate) struct PdfImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: Vec<u8>,
}

/// Page size and margins in points.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PageGeometry {
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) left: f32,
    pub(crate) right: f32,
    pub(crate) top: f32,
    pub(crate) bottom: f32,
}

impl PageGeometry {
    /// A4 page with the given margins in inches.
    pub(crate) fn a4(margins: &PageMargins) -> Self {
        Self {
            width: A4_WIDTH,
            height: A4_HEIGHT,
            left: margins.left * POINTS_PER_INCH,
            right: margins.right * POINTS_PER_INCH,
            top: margins.top * POINTS_PER_INCH,
            bottom: margins.bottom * POINTS_PER_INCH,
        }
    }

    fn frame_width(&self) -> f32 {
        (self.width - self.left - self.right).max(1.0)
    }

    fn frame_height(&self) -> f32 {
        (self.height - self.top - self.bottom).max(1.0)
    }
}

fn fill_color(color: Rgb) -> (f32, f32, f32) {
    let c = |v: u8| f32::from(v) / 255.0;
    (c(color[0]), c(color[1]), c(color[2]))
}

/// Content stream for one page.
struct PageWriter {
    content: Content,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            content: Content::new(),
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let (r, g, b) = fill_color(color);
        self.content.save_state();
        self.content.set_fill_rgb(r, g, b);
        self.content.rect(x, y, width, height);
        self.content.fill_nonzero();
        self.content.restore_state();
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.content.save_state();
        self.content.set_line_width(0.5);
        self.content.set_stroke_rgb(0.0, 0.0, 0.0);
        self.content.rect(x, y, width, height);
        self.content.stroke();
        self.content.restore_state();
    }

    fn image(&mut self, name: &str, x: f32, y: f32, width: f32, height: f32) {
        self.content.save_state();
        self.content.transform([width, 0.0, 0.0, height, x, y]);
        self.content.x_object(Name(name.as_bytes()));
        self.content.restore_state();
    }

    fn finish(self) -> Vec<u8> {
        self.content.finish()
    }
}

impl PageCanvas for PageWriter {
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32 {
        font.text_width(text, size)
    }

    fn draw_text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Rgb, text: &str) {
        let (r, g, b) = fill_color(color);
        self.content.begin_text();
        self.content.set_font(Name(font.resource_name().as_bytes()), size);
        self.content.set_fill_rgb(r, g, b);
        self.content.next_line(x, y);
        self.content.show(Str(&encode(text)));
        self.content.end_text();
    }
}

/// Resource name of an image XObject.
fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

/// A word made of one or more differently styled fragments.
type Word = Vec<Run>;

/// Split runs into words at whitespace, keeping styled fragments.
fn words(runs: &[Run]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Word = Vec::new();

    for run in runs {
        let mut buf = String::new();
        for ch in run.text.chars() {
            if ch.is_whitespace() {
                if !buf.is_empty() {
                    current.push(Run {
                        text: mem::take(&mut buf),
                        ..run.clone()
                    });
                }
                if !current.is_empty() {
                    words.push(mem::take(&mut current));
                }
            } else {
                buf.push(ch);
            }
        }
        if !buf.is_empty() {
            current.push(Run { text: buf, ..run.clone() });
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn word_width(word: &[Run], size: f32) -> f32 {
    word.iter().map(|run| run.font.text_width(&run.text, size)).sum()
}

/// Append a fragment, merging with the previous one when styles match.
fn push_fragment(line: &mut Vec<Run>, run: Run) {
    if let Some(last) = line.last_mut()
        && last.font == run.font
        && last.color == run.color
    {
        last.text.push_str(&run.text);
        return;
    }
    line.push(run);
}

/// Break a word that is wider than the frame into frame-wide chunks.
fn split_word(word: Word, size: f32, max_width: f32) -> Vec<Word> {
    let mut chunks = Vec::new();
    let mut chunk: Word = Vec::new();
    let mut width = 0.0;

    for run in word {
        for ch in run.text.chars() {
            let mut buf = [0; 4];
            let text = ch.encode_utf8(&mut buf);
            let w = run.font.text_width(text, size);
            if width + w > max_width && !chunk.is_empty() {
                chunks.push(mem::take(&mut chunk));
                width = 0.0;
            }
            push_fragment(
                &mut chunk,
                Run {
                    text: text.to_owned(),
                    font: run.font,
                    color: run.color,
                },
            );
            width += w;
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
    chunks
}

/// Greedy line breaking at word boundaries.
pub(crate) fn wrap(runs: &[Run], size: f32, max_width: f32) -> Vec<Vec<Run>> {
    let mut lines: Vec<Vec<Run>> = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut width = 0.0;

    for word in words(runs) {
        let w = word_width(&word, size);

        // The separating space takes the style of the text before it.
        if let Some(last) = line.last()
            && width + last.font.text_width(" ", size) + w <= max_width
        {
            let space = Run {
                text: " ".to_owned(),
                font: last.font,
                color: last.color,
            };
            width += space.font.text_width(" ", size) + w;
            push_fragment(&mut line, space);
            for run in word {
                push_fragment(&mut line, run);
            }
            continue;
        }

        if !line.is_empty() {
            lines.push(mem::take(&mut line));
        }

        if w > max_width {
            let mut chunks = split_word(word, size, max_width);
            let last = chunks.pop();
            lines.extend(chunks);
            line = last.unwrap_or_default();
            width = word_width(&line, size);
        } else {
            line = word;
            width = w;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Hard-wrap monospaced lines to `max_chars` columns.
fn wrap_fixed(lines: &[String], max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let expanded = line.replace('\t', "    ");
        let chars: Vec<char> = expanded.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(max_chars).map(|chunk| chunk.iter().collect()));
    }
    out
}

/// Page-by-page story placement.
struct Layout<'a> {
    geometry: PageGeometry,
    decorator: Option<&'a PageDecorator<'a>>,
    pages: Vec<Vec<u8>>,
    page: PageWriter,
    y: f32,
    page_has_content: bool,
}

impl<'a> Layout<'a> {
    fn new(geometry: PageGeometry, decorator: Option<&'a PageDecorator<'a>>) -> Self {
        Self {
            geometry,
            decorator,
            pages: Vec::new(),
            page: PageWriter::new(),
            y: geometry.height - geometry.top,
            page_has_content: false,
        }
    }

    fn top(&self) -> f32 {
        self.geometry.height - self.geometry.top
    }

    fn close_page(&mut self) {
        let mut page = mem::replace(&mut self.page, PageWriter::new());
        if let Some(decorator) = self.decorator {
            decorator.decorate(
                &mut page,
                PageFrame {
                    width: self.geometry.width,
                    height: self.geometry.height,
                },
            );
        }
        self.pages.push(page.finish());
        self.y = self.top();
        self.page_has_content = false;
    }

    /// Start a new page unless `height` still fits on the current one.
    fn ensure(&mut self, height: f32) {
        if self.page_has_content && self.y - height < self.geometry.bottom {
            self.close_page();
        }
    }

    fn place(&mut self, flowable: &Flowable) {
        match flowable {
            Flowable::Paragraph(paragraph) => self.paragraph(paragraph),
            Flowable::Preformatted(block) => self.preformatted(block),
            Flowable::Table(table) => self.table(table),
            Flowable::Image(image) => self.image(image),
            Flowable::Spacer(height) => {
                // Spacers vanish at the top of a page.
                if self.page_has_content {
                    self.y -= height;
                    if self.y < self.geometry.bottom {
                        self.close_page();
                    }
                }
            }
        }
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        let x0 = self.geometry.left + paragraph.indent;
        let max_width = (self.geometry.frame_width() - paragraph.indent).max(1.0);

        for line in wrap(&paragraph.runs, paragraph.size, max_width) {
            self.ensure(paragraph.leading);
            let baseline = self.y - paragraph.size;
            let mut x = x0;
            for run in &line {
                self.page
                    .draw_text(x, baseline, run.font, paragraph.size, run.color, &run.text);
                x += run.font.text_width(&run.text, paragraph.size);
            }
            self.y -= paragraph.leading;
            self.page_has_content = true;
        }
    }

    fn preformatted(&mut self, block: &Preformatted) {
        let x = self.geometry.left + block.left_indent;
        let width = (self.geometry.frame_width() - block.left_indent - block.right_indent).max(1.0);
        let char_width = Font::Courier.text_width(" ", block.size);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_chars = ((width - 2.0 * PADDING) / char_width).floor().max(1.0) as usize;
        let lines = wrap_fixed(&block.lines, max_chars);

        let mut remaining = lines.as_slice();
        while !remaining.is_empty() {
            self.ensure(block.leading + 2.0 * PADDING);
            let available = self.y - self.geometry.bottom - 2.0 * PADDING;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let fit = ((available / block.leading).floor().max(1.0) as usize).min(remaining.len());
            let (chunk, rest) = remaining.split_at(fit);

            #[allow(clippy::cast_precision_loss)]
            let height = chunk.len() as f32 * block.leading + 2.0 * PADDING;
            if let Some(background) = block.background {
                self.page
                    .fill_rect(x, self.y - height, width, height, background);
            }
            let mut baseline = self.y - PADDING - block.size;
            for line in chunk {
                if !line.is_empty() {
                    self.page
                        .draw_text(x + PADDING, baseline, Font::Courier, block.size, BLACK, line);
                }
                baseline -= block.leading;
            }
            self.y -= height;
            self.page_has_content = true;
            remaining = rest;
        }
    }

    fn table(&mut self, table: &TableBlock) {
        let columns = table.columns.max(1);
        #[allow(clippy::cast_precision_loss)]
        let col_width = self.geometry.frame_width() / columns as f32;
        let text_width = (col_width - 2.0 * PADDING).max(1.0);

        for (i, row) in table.rows.iter().enumerate() {
            let font = if table.has_header && i == 0 {
                Font::HelveticaBold
            } else {
                Font::Helvetica
            };
            let cells: Vec<Vec<Vec<Run>>> = (0..columns)
                .map(|col| {
                    let text = row.get(col).map_or("", String::as_str);
                    let runs = [Run {
                        text: text.to_owned(),
                        font,
                        color: BLACK,
                    }];
                    wrap(&runs, table.size, text_width)
                })
                .collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            #[allow(clippy::cast_precision_loss)]
            let height = line_count as f32 * table.leading + 2.0 * PADDING;

            self.ensure(height);
            for (col, lines) in cells.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let x = self.geometry.left + col as f32 * col_width;
                self.page.stroke_rect(x, self.y - height, col_width, height);
                let mut baseline = self.y - PADDING - table.size;
                for line in lines {
                    let mut cx = x + PADDING;
                    for run in line {
                        self.page
                            .draw_text(cx, baseline, run.font, table.size, run.color, &run.text);
                        cx += run.font.text_width(&run.text, table.size);
                    }
                    baseline -= table.leading;
                }
            }
            self.y -= height;
            self.page_has_content = true;
        }
    }

    fn image(&mut self, image: &ImageBlock) {
        let scale = (self.geometry.frame_width() / image.width)
            .min(self.geometry.frame_height() / image.height)
            .min(1.0);
        let (width, height) = (image.width * scale, image.height * scale);

        self.ensure(height);
        self.page.image(
            &image_name(image.index),
            self.geometry.left,
            self.y - height,
            width,
            height,
        );
        self.y -= height;
        self.page_has_content = true;
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        if self.page_has_content || self.pages.is_empty() {
            self.close_page();
        }
        self.pages
    }
}

/// Lay out the story and serialize the document.
pub(crate) fn render(
    story: &[Flowable],
    images: &[PdfImage],
    geometry: PageGeometry,
    decorator: Option<&PageDecorator<'_>>,
) -> Vec<u8> {
    let mut layout = Layout::new(geometry, decorator);
    for flowable in story {
        layout.place(flowable);
    }
    let pages = layout.finish();

    let mut alloc = Ref::new(1);
    let catalog_id = alloc.bump();
    let page_tree_id = alloc.bump();
    let font_ids: Vec<(Font, Ref)> = Font::ALL.iter().map(|font| (*font, alloc.bump())).collect();
    let image_ids: Vec<Ref> = images.iter().map(|_| alloc.bump()).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc.bump(), alloc.bump())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(i32::try_from(page_ids.len()).unwrap_or(i32::MAX));

    let image_names: Vec<String> = (0..images.len()).map(image_name).collect();

    for (content, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height));
            page.parent(page_tree_id);
            page.contents(*content_id);
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (font, id) in &font_ids {
                    fonts.pair(Name(font.resource_name().as_bytes()), *id);
                }
                fonts.finish();
            }
            if !image_ids.is_empty() {
                let mut x_objects = resources.x_objects();
                for (name, id) in image_names.iter().zip(&image_ids) {
                    x_objects.pair(Name(name.as_bytes()), *id);
                }
                x_objects.finish();
            }
            resources.finish();
            page.finish();
        }
        pdf.stream(*content_id, content);
    }

    for (font, id) in &font_ids {
        pdf.type1_font(*id)
            .base_font(Name(font.base_font().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    for (image, id) in images.iter().zip(&image_ids) {
        let mut x_object = pdf.image_xobject(*id, &image.data);
        x_object.filter(Filter::FlateDecode);
        x_object.width(i32::try_from(image.width).unwrap_or(i32::MAX));
        x_object.height(i32::try_from(image.height).unwrap_or(i32::MAX));
        x_object.color_space().device_rgb();
        x_object.bits_per_component(8);
        x_object.finish();
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> Run {
        Run {
            text: text.to_owned(),
            font: Font::Courier,
            color: BLACK,
        }
    }

    fn line_texts(lines: &[Vec<Run>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.iter().map(|r| r.text.as_str()).collect())
            .collect()
    }

    fn geometry() -> PageGeometry {
        PageGeometry::a4(&PageMargins::default())
    }

    #[test]
    fn test_wrap_at_word_boundaries() {
        // Courier at 10pt: 6pt per glyph, 60pt fits ten glyphs.
        let lines = wrap(&[run("aaa bbb ccc dddd")], 10.0, 60.0);
        assert_eq!(line_texts(&lines), vec!["aaa bbb", "ccc dddd"]);
    }

    #[test]
    fn test_wrap_keeps_styled_fragments_together() {
        let bold = Run {
            text: "bold".to_owned(),
            font: Font::HelveticaBold,
            color: BLACK,
        };
        let lines = wrap(&[run("x "), bold, run(", y")], 10.0, 500.0);
        assert_eq!(line_texts(&lines), vec!["x bold, y"]);
        assert_eq!(lines[0].len(), 3);
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap(&[run("abcdefghijkl")], 10.0, 30.0);
        assert_eq!(line_texts(&lines), vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap(&[run("   ")], 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_wrap_fixed() {
        let lines = wrap_fixed(&["abcdef".to_owned(), String::new(), "\tx".to_owned()], 4);
        assert_eq!(lines, vec!["abcd", "ef", "", "    ", "x"]);
    }

    #[test]
    fn test_empty_story_has_one_page() {
        let pdf = render(&[], &[], geometry(), None);
        assert!(pdf.starts_with(b"%PDF-"));
        assert_eq!(String::from_utf8_lossy(&pdf).matches("/Count 1").count(), 1);
    }

    #[test]
    fn test_long_story_breaks_pages() {
        let paragraph = Flowable::Paragraph(Paragraph {
            runs: vec![run("line")],
            size: 10.0,
            leading: 12.0,
            indent: 0.0,
        });
        // ~58 lines fit in the A4 frame with 1in margins.
        let story = vec![paragraph; 150];
        let pdf = render(&story, &[], geometry(), None);
        assert!(String::from_utf8_lossy(&pdf).contains("/Count 3"));
    }

    #[test]
    fn test_decorator_runs_on_every_page() {
        let config = crate::decorator::HeaderFooterConfig::default();
        let decorator = PageDecorator::new(&config).unwrap();
        let block = Flowable::Preformatted(Preformatted {
            lines: vec!["x".to_owned(); 200],
            size: 9.0,
            leading: 11.0,
            left_indent: 20.0,
            right_indent: 20.0,
            background: Some([211, 211, 211]),
        });

        let mut layout = Layout::new(geometry(), Some(&decorator));
        layout.place(&block);
        let pages = layout.finish();

        assert!(pages.len() >= 3);
        for page in &pages {
            assert!(String::from_utf8_lossy(page).contains("(GoAGI) Tj"));
        }
    }

    #[test]
    fn test_leading_spacer_is_dropped() {
        let mut layout = Layout::new(geometry(), None);
        let top = layout.y;
        layout.place(&Flowable::Spacer(12.0));
        assert!((layout.y - top).abs() < f32::EPSILON);
    }
}
