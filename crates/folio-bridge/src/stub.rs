// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub collaborators for builds where a converter or OCR engine is missing.
//
// Every method returns `CollaboratorUnavailable`; the pipeline records that as
// a tier failure and falls through to the next tier.

use folio_core::error::{FolioError, Result};

use crate::traits::*;

/// Word-processor converter placeholder.
pub struct UnavailableHtmlConverter;

impl HtmlConverter for UnavailableHtmlConverter {
    fn convert_to_html(&self, _document: &[u8]) -> Result<ConvertedHtml> {
        tracing::warn!("HtmlConverter::convert_to_html called on stub converter");
        Err(FolioError::CollaboratorUnavailable("word-processor converter"))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Structured PDF converter placeholder.
pub struct UnavailablePdfConverter;

impl PdfMarkdownConverter for UnavailablePdfConverter {
    fn convert(&self, _pdf: &[u8]) -> Result<String> {
        tracing::warn!("PdfMarkdownConverter::convert called on stub converter");
        Err(FolioError::CollaboratorUnavailable("structured PDF converter"))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// OCR engine placeholder.
pub struct UnavailableOcrEngine;

impl OcrEngine for UnavailableOcrEngine {
    fn create_session(&self, _languages: &[String]) -> Result<Box<dyn OcrSession>> {
        tracing::warn!("OcrEngine::create_session called on stub engine");
        Err(FolioError::CollaboratorUnavailable("OCR engine"))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
