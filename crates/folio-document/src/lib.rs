// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Document structural extraction for manuscripts.
//
// Turns word-processor documents, PDFs (digital or scanned), HTML, plain text
// and page images into Markdown, HTML and plain text, segmented into a
// preface and an ordered chapter list, with warnings and confidence scores
// for everything that could not be recovered cleanly.

pub mod aggregate;
pub mod docx;
pub mod extractor;
pub mod html;
pub mod markdown;
pub mod pdf;
pub mod router;
pub mod scan;
pub mod structure;

// Re-export the primary entry points so callers can use `folio_document::Extractor` etc.
pub use aggregate::{align_drafts, merge_chapters, ChapterDraft};
pub use docx::DocxHtmlConverter;
pub use extractor::{Extractor, ExtractorBuilder};
pub use html::{html_to_markdown, html_to_text};
pub use markdown::{markdown_to_html, markdown_to_text};
pub use pdf::{LopdfMarkdownConverter, PdfReader};
pub use scan::OcrClient;
pub use structure::{extract_chapters, extract_preface, extract_structure, DocumentStructure};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrsEngine};
