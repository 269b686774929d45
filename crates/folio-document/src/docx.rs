// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process word-processor → HTML converter for Office Open XML packages.
//
// Reads `word/document.xml` from the ZIP container and emits the small HTML
// vocabulary the transducer understands: `<h1>`–`<h6>` for heading styles,
// `<p>` for body paragraphs, `<ul><li>` for numbered/list paragraphs, and
// `<strong>`/`<em>`/`<u>` for run formatting.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use tracing::{debug, instrument};
use zip::ZipArchive;

use folio_bridge::{ConvertedHtml, HtmlConverter};
use folio_core::error::{FolioError, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// DOCX → HTML converter backed by `zip` + `quick-xml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxHtmlConverter;

impl HtmlConverter for DocxHtmlConverter {
    #[instrument(skip_all, fields(bytes_len = document.len()))]
    fn convert_to_html(&self, document: &[u8]) -> Result<ConvertedHtml> {
        let xml = read_document_part(document)?;
        let converted = document_xml_to_html(&xml)?;
        debug!(html_len = converted.value.len(), "DOCX converted to HTML");
        Ok(converted)
    }

    fn name(&self) -> &str {
        "docx"
    }
}

fn read_document_part(document: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(document))
        .map_err(|err| FolioError::Conversion(format!("not a ZIP package: {err}")))?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(|err| {
        FolioError::Conversion(format!("{DOCUMENT_PART} missing from package: {err}"))
    })?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Formatting flags of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
}

/// Paragraph under construction.
#[derive(Debug, Default)]
struct ParagraphState {
    style: Option<String>,
    is_list: bool,
    segments: Vec<(RunStyle, String)>,
}

impl ParagraphState {
    fn push_text(&mut self, style: RunStyle, text: &str) {
        match self.segments.last_mut() {
            Some((last, buf)) if *last == style => buf.push_str(text),
            _ => self.segments.push((style, text.to_string())),
        }
    }

    fn push_break(&mut self) {
        self.segments.push((RunStyle::default(), "\n".to_string()));
    }

    fn render_inline(&self) -> String {
        let mut html = String::new();
        for (style, text) in &self.segments {
            if text == "\n" {
                html.push_str("<br/>");
                continue;
            }
            let mut piece = escape_html(text);
            if style.underline {
                piece = format!("<u>{piece}</u>");
            }
            if style.italic {
                piece = format!("<em>{piece}</em>");
            }
            if style.bold {
                piece = format!("<strong>{piece}</strong>");
            }
            html.push_str(&piece);
        }
        html
    }

    fn is_blank(&self) -> bool {
        self.segments.iter().all(|(_, text)| text.trim().is_empty())
    }
}

/// Convert the body XML of a DOCX package to HTML.
pub fn document_xml_to_html(xml: &str) -> Result<ConvertedHtml> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();

    let mut blocks: Vec<String> = Vec::new();
    let mut list_items: Vec<String> = Vec::new();
    let mut messages = Vec::new();
    let mut drawings = 0usize;

    let mut paragraph: Option<ParagraphState> = None;
    let mut run = RunStyle::default();
    let mut in_text = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| FolioError::Conversion(format!("malformed document XML: {err}")))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"p" => {
                        if !is_empty {
                            paragraph = Some(ParagraphState::default());
                        }
                    }
                    b"r" => run = RunStyle::default(),
                    b"pStyle" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.style = attr_value(e, b"val");
                            if p.style.as_deref().is_some_and(|s| s.starts_with("List")) {
                                p.is_list = true;
                            }
                        }
                    }
                    b"numPr" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.is_list = true;
                        }
                    }
                    b"b" => run.bold = toggle_on(e),
                    b"i" => run.italic = toggle_on(e),
                    b"u" => {
                        run.underline = attr_value(e, b"val").is_none_or(|v| v != "none")
                    }
                    b"t" => in_text = !is_empty,
                    b"tab" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push_text(run, " ");
                        }
                    }
                    b"br" | b"cr" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push_break();
                        }
                    }
                    b"drawing" | b"pict" => drawings += 1,
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                if let (true, Some(p)) = (in_text, paragraph.as_mut()) {
                    let text = e.unescape().map_err(|err| {
                        FolioError::Conversion(format!("bad text in document XML: {err}"))
                    })?;
                    p.push_text(run, &text);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(p) = paragraph.take() {
                        finish_paragraph(p, &mut blocks, &mut list_items);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    flush_list(&mut blocks, &mut list_items);

    if drawings > 0 {
        messages.push(format!("{drawings} embedded drawing(s) were not imported"));
    }

    Ok(ConvertedHtml {
        value: blocks.join("\n"),
        messages,
    })
}

fn finish_paragraph(p: ParagraphState, blocks: &mut Vec<String>, list_items: &mut Vec<String>) {
    if p.is_blank() {
        return;
    }
    let inline = p.render_inline();

    if let Some(level) = heading_level_from_style(p.style.as_deref()) {
        flush_list(blocks, list_items);
        blocks.push(format!("<h{level}>{inline}</h{level}>"));
    } else if p.is_list {
        list_items.push(format!("<li>{inline}</li>"));
    } else {
        flush_list(blocks, list_items);
        blocks.push(format!("<p>{inline}</p>"));
    }
}

fn flush_list(blocks: &mut Vec<String>, list_items: &mut Vec<String>) {
    if list_items.is_empty() {
        return;
    }
    blocks.push(format!("<ul>{}</ul>", list_items.join("")));
    list_items.clear();
}

/// `Heading1`, `heading 2`, `Title` → heading level; anything else → body.
fn heading_level_from_style(style: Option<&str>) -> Option<usize> {
    let lowered = style?.trim().to_lowercase();
    if lowered == "title" {
        return Some(1);
    }
    let rest = lowered.strip_prefix("heading")?;
    let digits: String = rest.chars().filter(|ch| ch.is_ascii_digit()).collect();
    match digits.parse::<usize>() {
        Ok(level) if (1..=6).contains(&level) => Some(level),
        Ok(_) => Some(6),
        Err(_) => Some(1),
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>` is on; `<w:b w:val="0"/>` or `"false"` is off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(attr_value(e, b"val").as_deref(), Some("0" | "false" | "off"))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn body(inner: &str) -> String {
        format!(r#"<?xml version="1.0"?><w:document {NS}><w:body>{inner}</w:body></w:document>"#)
    }

    #[test]
    fn headings_paragraphs_and_runs() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Chapter One</w:t></w:r></w:p>
               <w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Bold </w:t></w:r><w:r><w:t>plain &amp; more</w:t></w:r></w:p>"#,
        );
        let html = document_xml_to_html(&xml).unwrap();
        assert_eq!(
            html.value,
            "<h2>Chapter One</h2>\n<p><strong>Bold </strong>plain &amp; more</p>"
        );
        assert!(html.messages.is_empty());
    }

    #[test]
    fn list_paragraphs_are_grouped() {
        let xml = body(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr></w:pPr><w:r><w:t>one</w:t></w:r></w:p>
               <w:p><w:pPr><w:pStyle w:val="ListParagraph"/></w:pPr><w:r><w:t>two</w:t></w:r></w:p>
               <w:p><w:r><w:t>after</w:t></w:r></w:p>"#,
        );
        let html = document_xml_to_html(&xml).unwrap();
        assert_eq!(html.value, "<ul><li>one</li><li>two</li></ul>\n<p>after</p>");
    }

    #[test]
    fn disabled_toggles_and_breaks() {
        let xml = body(
            r#"<w:p><w:r><w:rPr><w:b w:val="0"/><w:i/></w:rPr><w:t>a</w:t><w:br/><w:t>b</w:t></w:r></w:p>"#,
        );
        let html = document_xml_to_html(&xml).unwrap();
        assert_eq!(html.value, "<p><em>a</em><br/><em>b</em></p>");
    }

    #[test]
    fn drawings_are_reported() {
        let xml = body(r#"<w:p><w:r><w:drawing/></w:r><w:r><w:t>caption</w:t></w:r></w:p>"#);
        let html = document_xml_to_html(&xml).unwrap();
        assert_eq!(html.messages.len(), 1);
    }

    #[test]
    fn title_style_and_heading_levels() {
        assert_eq!(heading_level_from_style(Some("Title")), Some(1));
        assert_eq!(heading_level_from_style(Some("heading 3")), Some(3));
        assert_eq!(heading_level_from_style(Some("Normal")), None);
        assert_eq!(heading_level_from_style(None), None);
    }

    #[test]
    fn converts_zip_package() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file(DOCUMENT_PART, options).unwrap();
            zip.write_all(body(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#).as_bytes())
                .unwrap();
            zip.finish().unwrap();
        }
        let html = DocxHtmlConverter.convert_to_html(cursor.get_ref()).unwrap();
        assert_eq!(html.value, "<p>Hello</p>");
    }

    #[test]
    fn non_zip_input_is_conversion_error() {
        let result = DocxHtmlConverter.convert_to_html(b"plain text");
        assert!(matches!(result, Err(FolioError::Conversion(_))));
    }
}
