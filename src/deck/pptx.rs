//! Minimal PresentationML writer.
//!
//! A `.pptx` is a zip of XML parts. This writes the smallest package
//! PowerPoint, Keynote and LibreOffice all open without a repair prompt:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml, docProps/app.xml
//! ppt/presentation.xml (+ _rels)
//! ppt/slideMasters/slideMaster1.xml (+ _rels)
//! ppt/slideLayouts/slideLayout1.xml (+ _rels)   blank layout
//! ppt/theme/theme1.xml
//! ppt/slides/slideN.xml (+ _rels)                one per slide
//! ```
//!
//! Every slide uses the single blank layout; all formatting is inline on
//! the text runs.

use super::{Align, Deck, Slide, TextBox, SLIDE_HEIGHT, SLIDE_WIDTH};
use quick_xml::escape::escape;
use std::io::{Cursor, Seek, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum PptxError {
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_APP_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_CORE_PROPS: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP_PROPS: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

/// First `p:sldId`; ids below 256 are reserved.
const FIRST_SLIDE_ID: usize = 256;
const SLIDE_MASTER_ID: u64 = 2_147_483_648;
const SLIDE_LAYOUT_ID: u64 = 2_147_483_649;

/// Serialise `deck` into an in-memory `.pptx`.
pub fn to_bytes(deck: &Deck) -> Result<Vec<u8>, PptxError> {
    let cursor = write_package(deck, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

/// Write the full package for `deck` into `writer` and hand it back.
pub fn write_package<W: Write + Seek>(deck: &Deck, writer: W) -> Result<W, PptxError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let n = deck.slides.len();

    let mut part = |name: &str, body: String| -> Result<(), PptxError> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };

    part("[Content_Types].xml", content_types(n))?;
    part("_rels/.rels", package_rels())?;
    part("docProps/core.xml", core_props(&deck.title))?;
    part("docProps/app.xml", app_props(n))?;
    part("ppt/presentation.xml", presentation(n))?;
    part("ppt/_rels/presentation.xml.rels", presentation_rels(n))?;
    part("ppt/slideMasters/slideMaster1.xml", slide_master())?;
    part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml"),
            ("rId2", REL_THEME, "../theme/theme1.xml"),
        ]),
    )?;
    part("ppt/slideLayouts/slideLayout1.xml", slide_layout())?;
    part(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml")]),
    )?;
    part("ppt/theme/theme1.xml", theme())?;

    for (i, slide) in deck.slides.iter().enumerate() {
        part(&format!("ppt/slides/slide{}.xml", i + 1), slide_xml(slide))?;
        part(
            &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
            relationships(&[("rId1", REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml")]),
        )?;
    }

    Ok(zip.finish()?)
}

// ── Package-level parts ──────────────────────────────────────────────────

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#
    );
    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml".to_string(), CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml".to_string(), CT_THEME),
        ("/docProps/core.xml".to_string(), CT_CORE_PROPS),
        ("/docProps/app.xml".to_string(), CT_APP_PROPS),
    ];
    overrides.extend((1..=slides).map(|i| (format!("/ppt/slides/slide{i}.xml"), CT_SLIDE)));
    for (name, ct) in overrides {
        xml.push_str(&format!(r#"<Override PartName="{name}" ContentType="{ct}"/>"#));
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels() -> String {
    relationships(&[
        ("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
        ("rId2", REL_CORE_PROPS, "docProps/core.xml"),
        ("rId3", REL_APP_PROPS, "docProps/app.xml"),
    ])
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{NS_PKG_RELS}">"#);
    for (id, kind, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>lyricdeck</dc:creator><cp:revision>1</cp:revision></cp:coreProperties>"#,
        xml_text(title)
    )
}

fn app_props(slides: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>lyricdeck</Application><PresentationFormat>Custom</PresentationFormat><Slides>{slides}</Slides><AppVersion>{}</AppVersion></Properties>"#,
        app_version()
    )
}

/// `AppVersion` must look like `XX.YYYY`.
fn app_version() -> String {
    let major: u32 = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
    let minor: u32 = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
    format!("{major:02}.{minor:04}")
}

// ── Presentation, master, layout, theme ──────────────────────────────────

fn presentation(slides: usize) -> String {
    let mut ids = String::new();
    for i in 0..slides {
        ids.push_str(&format!(
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            FIRST_SLIDE_ID + i,
            i + 3
        ));
    }
    format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="{SLIDE_MASTER_ID}" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

fn presentation_rels(slides: usize) -> String {
    let targets: Vec<String> = (1..=slides).map(|i| format!("slides/slide{i}.xml")).collect();
    let ids: Vec<String> = (0..slides).map(|i| format!("rId{}", i + 3)).collect();

    let mut rels = vec![
        ("rId1", REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
        ("rId2", REL_THEME, "theme/theme1.xml"),
    ];
    rels.extend(
        ids.iter()
            .zip(&targets)
            .map(|(id, target)| (id.as_str(), REL_SLIDE, target.as_str())),
    );
    relationships(&rels)
}

fn empty_tree() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="{SLIDE_LAYOUT_ID}" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#,
        empty_tree()
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        empty_tree()
    )
}

fn theme() -> String {
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="{NS_A}" name="lyricdeck"><a:themeElements><a:clrScheme name="lyricdeck"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="lyricdeck"><a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="lyricdeck"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

// ── Slides ───────────────────────────────────────────────────────────────

fn slide_xml(slide: &Slide) -> String {
    let mut shapes = String::new();
    for (i, text_box) in slide.boxes.iter().enumerate() {
        // id 1 is the group shape.
        shapes.push_str(&text_box_xml(text_box, i + 2));
    }
    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree>{}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        slide.background.hex(),
        empty_tree()
    )
}

fn text_box_xml(b: &TextBox, id: usize) -> String {
    let style = &b.style;
    let wrap = if style.word_wrap { "square" } else { "none" };
    let algn = match style.align {
        Align::Center => "ctr",
        Align::Right => "r",
    };

    let mut run_props = format!(r#"lang="en-US" sz="{}""#, style.size_pt * 100);
    if style.bold {
        run_props.push_str(r#" b="1""#);
    }
    if style.italic {
        run_props.push_str(r#" i="1""#);
    }

    let mut paragraphs = String::new();
    for line in b.text.split('\n') {
        paragraphs.push_str(&format!(
            r#"<a:p><a:pPr algn="{algn}"/><a:r><a:rPr {run_props} dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:latin typeface="{font}"/></a:rPr><a:t>{text}</a:t></a:r></a:p>"#,
            color = style.color.hex(),
            font = style.font,
            text = xml_text(line),
        ));
    }

    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="{wrap}" rtlCol="0"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        name = b.name,
        x = b.x,
        y = b.y,
        cx = b.cx,
        cy = b.cy,
    )
}

/// Escape `s` for XML text content, dropping characters XML 1.0 cannot
/// represent at all (C0 controls other than tab/newline/CR, U+FFFE/U+FFFF).
fn xml_text(s: &str) -> String {
    let valid: String = s
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect();
    escape(valid.as_str()).into_owned()
}
