// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end extraction over generated documents, plus the structural laws
// every Markdown segmentation must satisfy.

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use folio_bridge::{OcrEngine, OcrSession, PdfMarkdownConverter, Recognition};
use folio_core::error::{FolioError, Result};
use folio_core::types::{ConverterKind, DocumentFormat, ExtractOptions, Locale};
use folio_document::html::strip_tags;
use folio_document::{extract_chapters, extract_structure, html_to_markdown, Extractor};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const MANUSCRIPTS: &[&str] = &[
    "# Title\n\nBody para.\n\n## Sub\n\nMore text.\n",
    "Dedication line.\n\n# One\nfirst\n\n\n# Two\n\nsecond\n### Deep\nthird",
    "No headings at all.\nJust prose\n\nacross paragraphs.",
    "Lead in\n#Not a heading\n###### Six\n  indented text\n# Back to one",
];

struct CountingOcr {
    text: &'static str,
    confidence: f32,
    sessions: Arc<AtomicUsize>,
    terminated: Arc<AtomicUsize>,
}

struct CountingSession {
    text: &'static str,
    confidence: f32,
    terminated: Arc<AtomicUsize>,
}

impl OcrEngine for CountingOcr {
    fn create_session(&self, _languages: &[String]) -> Result<Box<dyn OcrSession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            text: self.text,
            confidence: self.confidence,
            terminated: Arc::clone(&self.terminated),
        }))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

impl OcrSession for CountingSession {
    fn recognize(&mut self, _image: &[u8]) -> Result<Recognition> {
        Ok(Recognition {
            text: self.text.to_string(),
            confidence: self.confidence,
        })
    }

    fn terminate(&mut self) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// One page per entry: `Some(text)` paints text, `None` holds only an image.
fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => {
                let image_id = doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => 2,
                        "Height" => 2,
                        "ColorSpace" => "DeviceGray",
                        "BitsPerComponent" => 8,
                    },
                    vec![0, 255, 255, 0],
                ));
                resources.set("XObject", dictionary! { "Im1" => image_id });
                vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()],
                    ),
                    Operation::new("Do", vec!["Im1".into()]),
                    Operation::new("Q", vec![]),
                ]
            }
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn build_docx(body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

struct DecodingConverter;

impl PdfMarkdownConverter for DecodingConverter {
    fn convert(&self, _pdf: &[u8]) -> Result<String> {
        Ok("# Recovered\n\nText the content scan could not decode".to_string())
    }

    fn name(&self) -> &str {
        "decoding"
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Structural laws
// ---------------------------------------------------------------------------

#[test]
fn chapters_and_preface_reassemble_the_document() {
    for markdown in MANUSCRIPTS {
        let structure = extract_structure(markdown, Locale::En);
        let mut parts: Vec<String> = structure.preface.iter().map(|p| p.content.clone()).collect();
        parts.extend(structure.chapters.iter().map(|c| c.markdown.clone()));
        assert_eq!(normalize(&parts.join("\n")), normalize(markdown), "input: {markdown:?}");
    }
}

#[test]
fn chapter_level_matches_heading_hashes() {
    for markdown in MANUSCRIPTS {
        for chapter in extract_chapters(markdown) {
            assert!((1..=6).contains(&chapter.level));
            let hashes = chapter.markdown.chars().take_while(|&c| c == '#').count();
            assert_eq!(usize::from(chapter.level), hashes, "chapter {:?}", chapter.title);
        }
    }
}

#[test]
fn preface_never_overlaps_chapters() {
    for markdown in MANUSCRIPTS {
        let structure = extract_structure(markdown, Locale::En);
        let Some(preface) = structure.preface else {
            continue;
        };
        for chapter in &structure.chapters {
            assert!(!chapter.markdown.contains(&preface.content));
            assert!(!preface.content.contains(&chapter.markdown));
        }
    }
}

#[test]
fn transducer_is_idempotent() {
    let inputs = [
        "<h1>A</h1><p>x</p><strong>y</strong>",
        "<h2>Part &amp; parcel</h2><ul><li>one</li><li><em>two</em></li></ul><blockquote><p>q</p></blockquote>",
        "<p>Line<br>break and <a href=\"https://example.org\">link</a></p><pre><code>let x = 1;</code></pre>",
    ];
    for html in inputs {
        let once = html_to_markdown(html);
        let twice = html_to_markdown(&strip_tags(&once));
        assert_eq!(once, twice, "input: {html}");
    }
}

#[test]
fn headed_markdown_scenario() {
    let structure = extract_structure("# Title\n\nBody para.\n\n## Sub\n\nMore text.\n", Locale::En);
    assert!(structure.preface.is_none());
    let summary: Vec<(&str, u8)> = structure
        .chapters
        .iter()
        .map(|c| (c.title.as_str(), c.level))
        .collect();
    assert_eq!(summary, vec![("Title", 1), ("Sub", 2)]);
}

#[test]
fn headingless_markdown_is_all_preface() {
    let markdown = "\nFirst line here\nsecond line\n\nthird paragraph";
    let structure = extract_structure(markdown, Locale::Es);
    assert!(structure.chapters.is_empty());
    let preface = structure.preface.unwrap();
    assert_eq!(preface.title, "First line here");
    assert_eq!(preface.content, markdown.trim());
}

// ---------------------------------------------------------------------------
// End-to-end extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn docx_manuscript_end_to_end() {
    let docx = build_docx(
        r#"<w:p><w:r><w:t>For my family.</w:t></w:r></w:p>
           <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Chapter One</w:t></w:r></w:p>
           <w:p><w:r><w:t xml:space="preserve">It was a </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>dark</w:t></w:r><w:r><w:t xml:space="preserve"> night.</w:t></w:r></w:p>
           <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Chapter Two</w:t></w:r></w:p>
           <w:p><w:r><w:t>Morning came.</w:t></w:r></w:p>"#,
    );

    let result = Extractor::default()
        .extract(&docx, &ExtractOptions::default().with_format("manuscript.docx"))
        .await
        .unwrap();

    assert_eq!(result.format, DocumentFormat::Docx);
    assert_eq!(
        result.markdown,
        "For my family.\n\n# Chapter One\n\nIt was a *dark* night.\n\n# Chapter Two\n\nMorning came."
    );
    let preface = result.preface.as_ref().unwrap();
    assert_eq!(preface.content, "For my family.");
    assert_eq!(result.chapters.len(), 2);
    assert_eq!(result.chapters[0].title, "Chapter One");
    assert!(result.chapters[0].html.starts_with("<h1>Chapter One</h1>"));
    assert_eq!(result.chapters[1].markdown, "# Chapter Two\n\nMorning came.");
    assert!(!result.metadata.is_scanned);
    assert_eq!(result.estimated_pages, 1);
}

#[tokio::test]
async fn sniffed_docx_without_hint() {
    let docx = build_docx(r#"<w:p><w:r><w:t>Only prose.</w:t></w:r></w:p>"#);
    let result = Extractor::default()
        .extract(&docx, &ExtractOptions::default())
        .await
        .unwrap();
    assert_eq!(result.format, DocumentFormat::Docx);
    assert_eq!(result.text, "Only prose.");
    assert!(result.chapters.is_empty());
    assert_eq!(result.preface.unwrap().title, "Only prose.");
}

#[tokio::test]
async fn digital_pdf_end_to_end() {
    let pdf = build_pdf(&[Some("First page words"), Some("Second page words")]);
    let engine = CountingOcr {
        text: "should not run",
        confidence: 1.0,
        sessions: Arc::new(AtomicUsize::new(0)),
        terminated: Arc::new(AtomicUsize::new(0)),
    };
    let sessions = Arc::clone(&engine.sessions);
    let extractor = Extractor::builder().ocr_engine(Arc::new(engine)).build().unwrap();

    let result = extractor
        .extract(&pdf, &ExtractOptions::default().with_format("application/pdf"))
        .await
        .unwrap();

    assert_eq!(result.format, DocumentFormat::Pdf);
    assert_eq!(result.metadata.converter_used, ConverterKind::NativeScanner);
    assert!(result.markdown.contains("First page words"));
    assert!(result.markdown.contains("Second page words"));
    assert_eq!(result.estimated_pages, 2);
    assert!(!result.metadata.is_scanned);
    assert_eq!(sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scanned_pdf_is_read_by_ocr_with_low_confidence_warning() {
    let pdf = build_pdf(&[None]);
    let engine = CountingOcr {
        text: "The recognised page of a scanned manuscript",
        confidence: 0.3,
        sessions: Arc::new(AtomicUsize::new(0)),
        terminated: Arc::new(AtomicUsize::new(0)),
    };
    let sessions = Arc::clone(&engine.sessions);
    let terminated = Arc::clone(&engine.terminated);
    let extractor = Extractor::builder().ocr_engine(Arc::new(engine)).build().unwrap();

    let result = extractor
        .extract(&pdf, &ExtractOptions::default().with_languages(["eng"]))
        .await
        .unwrap();

    assert_eq!(result.format, DocumentFormat::Pdf);
    assert_eq!(result.metadata.converter_used, ConverterKind::Ocr);
    assert!(result.metadata.is_scanned);
    assert_eq!(result.metadata.confidence, Some(0.3));
    assert_eq!(result.markdown, "The recognised page of a scanned manuscript");
    assert!(result.warnings.iter().any(|w| w.contains("confidence is low")));
    assert_eq!(sessions.load(Ordering::SeqCst), 1);
    assert_eq!(terminated.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn image_marked_pdf_is_recovered_by_structured_converter() {
    let pdf = build_pdf(&[None]);
    let extractor = Extractor::builder()
        .pdf_converter(Arc::new(DecodingConverter))
        .build()
        .unwrap();

    let result = extractor.extract(&pdf, &ExtractOptions::default()).await.unwrap();

    assert_eq!(result.metadata.converter_used, ConverterKind::StructuredConverter);
    assert!(!result.metadata.is_scanned);
    assert_eq!(result.chapters.len(), 1);
    assert_eq!(result.chapters[0].title, "Recovered");
    assert_eq!(
        result.warnings,
        vec!["Content-stream scan found no extractable text".to_string()]
    );
}

#[tokio::test]
async fn scanned_pdf_without_ocr_fails_with_diagnostics() {
    let pdf = build_pdf(&[None, None]);
    let err = Extractor::default()
        .extract(&pdf, &ExtractOptions::default())
        .await
        .unwrap_err();
    match err {
        FolioError::ExtractionFailed { warnings, .. } => {
            assert!(warnings.iter().any(|w| w.contains("OCR unavailable")));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn concurrent_calls_share_one_extractor() {
    let extractor = Arc::new(Extractor::default());
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let extractor = Arc::clone(&extractor);
            tokio::spawn(async move {
                let text = format!("# Chapter {n}\n\nbody {n}");
                extractor.extract(text.as_bytes(), &ExtractOptions::default()).await
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.chapters[0].title, format!("Chapter {n}"));
    }
}
