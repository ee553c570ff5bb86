//! OOXML package assembly.
//!
//! Static parts (styles, numbering, properties) and the ZIP container for a
//! WordprocessingML document.

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::RenderError;

pub(super) const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(super) const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(super) const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(super) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(super) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Bullet list numbering instance.
pub(super) const BULLET_NUM_ID: u32 = 1;

/// Image stored under `word/media`.
pub(super) struct MediaPart {
    /// Relationship id referenced from the drawing.
    pub(super) rel_id: String,
    /// File name inside `word/media`.
    pub(super) file_name: String,
    /// Raw image bytes.
    pub(super) data: Vec<u8>,
}

/// Numbering instance for one ordered list.
pub(super) struct OrderedList {
    pub(super) num_id: u32,
    pub(super) start: u64,
}

/// Everything the package needs beyond the static parts.
pub(super) struct PackageParts<'a> {
    pub(super) document_xml: String,
    pub(super) header_xml: Option<&'a str>,
    pub(super) footer_xml: Option<&'a str>,
    pub(super) media: &'a [MediaPart],
    pub(super) ordered_lists: &'a [OrderedList],
}

/// Zip all parts into a `.docx` byte buffer.
pub(super) fn assemble(parts: &PackageParts<'_>) -> Result<Vec<u8>, RenderError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let decorated = parts.header_xml.is_some() && parts.footer_xml.is_some();

    let mut entry = |name: &str, data: &[u8], options: SimpleFileOptions| -> Result<(), RenderError> {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
        Ok(())
    };

    entry("[Content_Types].xml", content_types(decorated).as_bytes(), deflated)?;
    entry("_rels/.rels", package_rels().as_bytes(), deflated)?;
    entry("docProps/core.xml", core_properties().as_bytes(), deflated)?;
    entry("docProps/app.xml", app_properties().as_bytes(), deflated)?;
    entry("word/document.xml", parts.document_xml.as_bytes(), deflated)?;
    entry(
        "word/_rels/document.xml.rels",
        document_rels(decorated, parts.media).as_bytes(),
        deflated,
    )?;
    entry("word/styles.xml", styles().as_bytes(), deflated)?;
    entry(
        "word/numbering.xml",
        numbering(parts.ordered_lists).as_bytes(),
        deflated,
    )?;
    if let (Some(header), Some(footer)) = (parts.header_xml, parts.footer_xml) {
        entry("word/header1.xml", header.as_bytes(), deflated)?;
        entry("word/footer1.xml", footer.as_bytes(), deflated)?;
    }
    for media in parts.media {
        entry(&format!("word/media/{}", media.file_name), &media.data, stored)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn content_types(decorated: bool) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for (ext, mime) in [
        ("png", "image/png"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("gif", "image/gif"),
        ("bmp", "image/bmp"),
    ] {
        write!(xml, r#"<Default Extension="{ext}" ContentType="{mime}"/>"#).unwrap();
    }

    let wml = "application/vnd.openxmlformats-officedocument.wordprocessingml";
    let mut overrides = vec![
        ("/word/document.xml", format!("{wml}.document.main+xml")),
        ("/word/styles.xml", format!("{wml}.styles+xml")),
        ("/word/numbering.xml", format!("{wml}.numbering+xml")),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml".to_owned(),
        ),
        (
            "/docProps/app.xml",
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_owned(),
        ),
    ];
    if decorated {
        overrides.push(("/word/header1.xml", format!("{wml}.header+xml")));
        overrides.push(("/word/footer1.xml", format!("{wml}.footer+xml")));
    }
    for (part, content_type) in overrides {
        write!(xml, r#"<Override PartName="{part}" ContentType="{content_type}"/>"#).unwrap();
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels() -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    write!(
        xml,
        r#"<Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="word/document.xml"/>"#
    )
    .unwrap();
    xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
    write!(
        xml,
        r#"<Relationship Id="rId3" Type="{REL_BASE}/extended-properties" Target="docProps/app.xml"/>"#
    )
    .unwrap();
    xml.push_str("</Relationships>");
    xml
}

fn document_rels(decorated: bool, media: &[MediaPart]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    write!(
        xml,
        r#"<Relationship Id="rIdStyles" Type="{REL_BASE}/styles" Target="styles.xml"/>"#
    )
    .unwrap();
    write!(
        xml,
        r#"<Relationship Id="rIdNumbering" Type="{REL_BASE}/numbering" Target="numbering.xml"/>"#
    )
    .unwrap();
    if decorated {
        write!(
            xml,
            r#"<Relationship Id="rIdHeader1" Type="{REL_BASE}/header" Target="header1.xml"/>"#
        )
        .unwrap();
        write!(
            xml,
            r#"<Relationship Id="rIdFooter1" Type="{REL_BASE}/footer" Target="footer1.xml"/>"#
        )
        .unwrap();
    }
    for part in media {
        write!(
            xml,
            r#"<Relationship Id="{}" Type="{REL_BASE}/image" Target="media/{}"/>"#,
            part.rel_id, part.file_name
        )
        .unwrap();
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_properties() -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    xml.push_str("<dc:title>Markdown Export</dc:title><dc:creator>mdexport</dc:creator>");
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_properties() -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#);
    write!(xml, "<Application>mdexport {}</Application>", env!("CARGO_PKG_VERSION")).unwrap();
    xml.push_str("</Properties>");
    xml
}

/// Paragraph style with optional run size (half-points) and numbering.
fn paragraph_style(xml: &mut String, id: &str, name: &str, ppr: &str, rpr: &str) {
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{name}"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr>{ppr}</w:pPr><w:rPr>{rpr}</w:rPr></w:style>"#
    )
    .unwrap();
}

fn styles() -> String {
    let mut xml = String::from(XML_DECLARATION);
    write!(xml, r#"<w:styles xmlns:w="{NS_W}">"#).unwrap();
    xml.push_str(r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#);
    xml.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#);

    for (level, half_points) in [(1, 32), (2, 28), (3, 24)] {
        paragraph_style(
            &mut xml,
            &format!("Heading{level}"),
            &format!("heading {level}"),
            &format!(
                r#"<w:keepNext/><w:spacing w:before="240" w:after="80"/><w:outlineLvl w:val="{}"/>"#,
                level - 1
            ),
            &format!(
                r#"<w:b/><w:color w:val="2F5496"/><w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
            ),
        );
    }

    paragraph_style(
        &mut xml,
        "ListBullet",
        "List Bullet",
        &format!(
            r#"<w:numPr><w:numId w:val="{BULLET_NUM_ID}"/></w:numPr><w:spacing w:after="60"/><w:ind w:left="720" w:hanging="360"/>"#
        ),
        "",
    );
    paragraph_style(
        &mut xml,
        "ListNumber",
        "List Number",
        r#"<w:spacing w:after="60"/><w:ind w:left="720" w:hanging="360"/>"#,
        "",
    );
    paragraph_style(
        &mut xml,
        "NoSpacing",
        "No Spacing",
        r#"<w:spacing w:after="0" w:line="240" w:lineRule="auto"/>"#,
        "",
    );
    paragraph_style(&mut xml, "Caption", "caption", r#"<w:jc w:val="center"/>"#, "<w:i/>");

    xml.push_str(r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders>"#);
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        write!(
            xml,
            r#"<w:{side} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#
        )
        .unwrap();
    }
    xml.push_str(r#"</w:tblBorders><w:tblCellMar><w:left w:w="108" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style>"#);

    xml.push_str("</w:styles>");
    xml
}

/// Decimal abstract numbering id; bullets use 0.
const DECIMAL_ABSTRACT_ID: u32 = 1;

fn numbering(ordered_lists: &[OrderedList]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    write!(xml, r#"<w:numbering xmlns:w="{NS_W}">"#).unwrap();
    xml.push_str(r#"<w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/></w:rPr></w:lvl></w:abstractNum>"#);
    write!(
        xml,
        r#"<w:abstractNum w:abstractNumId="{DECIMAL_ABSTRACT_ID}"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum>"#
    )
    .unwrap();
    write!(
        xml,
        r#"<w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="0"/></w:num>"#
    )
    .unwrap();
    for list in ordered_lists {
        write!(
            xml,
            r#"<w:num w:numId="{}"><w:abstractNumId w:val="{DECIMAL_ABSTRACT_ID}"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="{}"/></w:lvlOverride></w:num>"#,
            list.num_id, list.start
        )
        .unwrap();
    }
    xml.push_str("</w:numbering>");
    xml
}
