// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator trait definitions.
//
// All methods are synchronous. The pipeline runs them on the blocking pool
// (`tokio::task::spawn_blocking`), so implementations are free to do heavy
// CPU work or call into native libraries.

use folio_core::error::Result;

/// HTML produced by a word-processor converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedHtml {
    /// The converted HTML fragment.
    pub value: String,
    /// Non-fatal converter diagnostics (unknown styles, dropped images, ...).
    pub messages: Vec<String>,
}

/// Converts a word-processor document to HTML.
pub trait HtmlConverter: Send + Sync {
    fn convert_to_html(&self, document: &[u8]) -> Result<ConvertedHtml>;

    /// Converter identifier for logging.
    fn name(&self) -> &str;
}

/// Converts a PDF to Markdown, recovering whatever structure it can.
pub trait PdfMarkdownConverter: Send + Sync {
    /// May fail or return an empty string; both are tier failures.
    fn convert(&self, pdf: &[u8]) -> Result<String>;

    fn name(&self) -> &str;
}

/// Raw output of one OCR recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Engine confidence, either in `[0, 1]` or as a percentage in `[0, 100]`.
    pub confidence: f32,
}

/// Factory for OCR sessions.
///
/// The engine is the long-lived capability (model files, native handles). It
/// is constructed once by the caller and shared across extraction calls.
pub trait OcrEngine: Send + Sync {
    /// Start a recognition session for the given languages.
    fn create_session(&self, languages: &[String]) -> Result<Box<dyn OcrSession>>;

    fn name(&self) -> &str;
}

/// One OCR worker, used for a single extraction call and then terminated.
pub trait OcrSession: Send {
    /// Recognise text in an image (or an image-only PDF, if supported).
    fn recognize(&mut self, image: &[u8]) -> Result<Recognition>;

    /// Release the session's resources. Called exactly once.
    fn terminate(&mut self);
}
