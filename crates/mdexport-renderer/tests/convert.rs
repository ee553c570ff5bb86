//! End-to-end conversion tests across all output formats.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mdexport_renderer::{
    Converter, DiagramRenderer, HeaderFooterConfig, OutputFormat, convert,
};
use pretty_assertions::assert_eq;

/// Renderer that always fails.
struct FailingRenderer;

impl DiagramRenderer for FailingRenderer {
    fn render(&self, _source: &str, _output_dir: &Path) -> Option<PathBuf> {
        None
    }
}

/// Renderer that writes a small PNG for every diagram.
struct PngRenderer;

impl DiagramRenderer for PngRenderer {
    fn render(&self, _source: &str, output_dir: &Path) -> Option<PathBuf> {
        let path = output_dir.join("diagram.png");
        image::RgbaImage::from_pixel(8, 4, image::Rgba([0, 128, 255, 255]))
            .save(&path)
            .ok()?;
        Some(path)
    }
}

const DIAGRAM_DOC: &str = "# Flow\n\n```mermaid\ngraph TD\n    A-->B\n```\n\nAfter";

fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_html_heading_and_bold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.html");

    let outcome = convert("# Title\n\nSome **bold** text", OutputFormat::Html, &path);

    assert!(outcome.success);
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("<h1>Title</h1>"));
    assert!(html.contains("<b>bold</b>"));
}

#[test]
fn test_word_table_two_by_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.docx");

    let outcome = convert(
        "| Name | Value |\n|------|-------|\n| a | 1 |",
        OutputFormat::Word,
        &path,
    );
    assert!(outcome.success);

    let bytes = std::fs::read(&path).unwrap();
    let xml = zip_entry(&bytes, "word/document.xml");
    assert_eq!(xml.matches("<w:tbl>").count(), 1);
    assert_eq!(xml.matches("<w:tr>").count(), 2);
    assert_eq!(xml.matches("<w:tc>").count(), 4);
    for cell in ["Name", "Value", "a", "1"] {
        assert!(xml.contains(&format!(">{cell}</w:t>")), "missing cell {cell}");
    }
}

#[test]
fn test_empty_input_every_format() {
    let dir = tempfile::tempdir().unwrap();
    for format in OutputFormat::ALL {
        let path = dir.path().join(format!("empty.{}", format.extension()));
        let outcome = convert("", format, &path);
        assert!(outcome.success, "{format}: {}", outcome.message);
        assert!(outcome.size > 0);
    }

    let pdf = std::fs::read(dir.path().join("empty.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    let docx = std::fs::read(dir.path().join("empty.docx")).unwrap();
    assert!(zip_entry(&docx, "word/document.xml").contains("<w:body>"));
}

#[test]
fn test_diagram_fallback_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let converter = Converter::new().with_diagrams(Arc::new(FailingRenderer));

    let html = converter
        .render(DIAGRAM_DOC, OutputFormat::Html, dir.path())
        .unwrap();
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("Mermaid Diagram (Rendering Failed):"));
    assert!(html.contains("A-->B"));
    assert!(html.contains("<p>After</p>"));

    let docx = converter
        .render(DIAGRAM_DOC, OutputFormat::Word, dir.path())
        .unwrap();
    let xml = zip_entry(&docx, "word/document.xml");
    assert!(xml.contains("[Mermaid Diagram]"));
    assert!(xml.contains("Failed to render diagram."));
    assert!(xml.contains("A--&gt;B"));

    let pdf = converter
        .render(DIAGRAM_DOC, OutputFormat::Pdf, dir.path())
        .unwrap();
    let pdf = String::from_utf8_lossy(&pdf);
    assert!(pdf.contains("(Failed to render diagram.) Tj"));
    assert!(pdf.contains("(    A-->B) Tj"));
}

#[test]
fn test_rendered_diagram_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let converter = Converter::new().with_diagrams(Arc::new(PngRenderer));

    let html = converter
        .render(DIAGRAM_DOC, OutputFormat::Html, dir.path())
        .unwrap();
    assert!(String::from_utf8(html).unwrap().contains(r#"<img src="images/diagram_"#));
    assert_eq!(std::fs::read_dir(dir.path().join("images")).unwrap().count(), 1);

    let docx = converter
        .render(DIAGRAM_DOC, OutputFormat::Word, dir.path())
        .unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(docx.as_slice())).unwrap();
    assert!(archive.by_name("word/media/image1.png").is_ok());

    let pdf = converter
        .render(DIAGRAM_DOC, OutputFormat::Pdf, dir.path())
        .unwrap();
    assert!(String::from_utf8_lossy(&pdf).contains("/Subtype /Image"));
}

#[test]
fn test_standalone_html_embeds_diagram() {
    let converter = Converter::new().with_diagrams(Arc::new(PngRenderer));

    let html = converter
        .render_standalone(DIAGRAM_DOC, OutputFormat::Html)
        .unwrap();
    let html = String::from_utf8(html).unwrap();

    assert!(html.contains(r#"<img src="data:image/png;base64,iVBORw0KGgo"#));
    assert!(!html.contains("images/diagram_"));
}

#[test]
fn test_missing_user_image_keeps_alt_text() {
    let dir = tempfile::tempdir().unwrap();
    let source = "![Company logo](missing/logo.png)";

    let docx = Converter::new()
        .render(source, OutputFormat::Word, dir.path())
        .unwrap();
    let xml = zip_entry(&docx, "word/document.xml");
    assert!(xml.contains("[Image: Company logo]"));
    assert!(!xml.contains("Mermaid"));

    let pdf = Converter::new()
        .render(source, OutputFormat::Pdf, dir.path())
        .unwrap();
    assert!(String::from_utf8_lossy(&pdf).contains("([Image: Company logo]) Tj"));
}

#[test]
fn test_unterminated_fence_runs_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let html = Converter::new()
        .render("```\n# not a heading\n- not a list", OutputFormat::Html, dir.path())
        .unwrap();
    let html = String::from_utf8(html).unwrap();
    assert!(html.contains("<pre><code>\n# not a heading\n- not a list\n</code></pre>"));
    assert!(!html.contains("<h1>"));
}

#[test]
fn test_header_footer_in_word_and_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = HeaderFooterConfig::default();
    config.header.text = "Quarterly Report".to_owned();
    let converter = Converter::new().with_header_footer(config);

    let docx = converter
        .render("Body", OutputFormat::Word, dir.path())
        .unwrap();
    assert!(zip_entry(&docx, "word/header1.xml").contains("Quarterly Report"));

    let long_doc = "line\n".repeat(300);
    let pdf = converter
        .render(&long_doc, OutputFormat::Pdf, dir.path())
        .unwrap();
    let pdf = String::from_utf8_lossy(&pdf);
    let headers = pdf.matches("(Quarterly Report) Tj").count();
    assert!(headers > 1);
    assert!(pdf.contains(&format!("/Count {headers}")));
}
