// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tiered PDF extraction.
//
// Three strategies share one contract (bytes in, text or a failure reason
// out) and are tried in a fixed order until one produces text:
//
//   A. content-stream scan      — cheap, always tried first
//   B. structured conversion    — lopdf-grade parsing, reads what A cannot
//   C. OCR                      — last resort, and the real path for scans
//
// A failed tier is never fatal: its reason becomes a warning and the next tier
// runs. Only when every tier comes back empty does extraction fail, carrying
// the accumulated warnings.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use folio_bridge::PdfMarkdownConverter;
use folio_core::config::ExtractionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::types::ConverterKind;

use super::scanner::{self, PdfKind};
use crate::aggregate::pages_from_words;
use crate::extractor::run_blocking;
use crate::scan::{run_ocr, OcrClient, OcrRequest};

/// One strategy in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfTier {
    NativeScanner,
    StructuredConverter,
    Ocr,
}

impl PdfTier {
    pub fn converter_kind(self) -> ConverterKind {
        match self {
            Self::NativeScanner => ConverterKind::NativeScanner,
            Self::StructuredConverter => ConverterKind::StructuredConverter,
            Self::Ocr => ConverterKind::Ocr,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NativeScanner => "content-stream scan",
            Self::StructuredConverter => "structured conversion",
            Self::Ocr => "OCR",
        }
    }

    /// Attempt order for a classified PDF. The classification only looks at
    /// the raw prefix, so a PDF judged scanned still gets the structured
    /// converter before OCR.
    pub fn order(kind: PdfKind, structured_first: bool) -> Vec<PdfTier> {
        match (kind, structured_first) {
            (PdfKind::Digital, true) => vec![Self::StructuredConverter, Self::NativeScanner, Self::Ocr],
            (PdfKind::Digital, false) | (PdfKind::Scanned, _) => {
                vec![Self::NativeScanner, Self::StructuredConverter, Self::Ocr]
            }
        }
    }
}

struct TierOutput {
    markdown: String,
    html: Option<String>,
    confidence: Option<f32>,
    warnings: Vec<String>,
}

enum TierOutcome {
    Produced(TierOutput),
    Failed(String),
}

/// What the chain produced for one PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfExtraction {
    pub kind: PdfKind,
    pub tier: PdfTier,
    pub markdown: String,
    /// Only the OCR tier renders its own HTML.
    pub html: Option<String>,
    pub confidence: Option<f32>,
    pub estimated_pages: u32,
    pub warnings: Vec<String>,
}

impl PdfExtraction {
    /// True when the text came from page images rather than text operators.
    pub fn is_scanned(&self) -> bool {
        self.tier == PdfTier::Ocr
    }
}

/// The fallback chain, borrowing the collaborators of one extraction call.
pub struct TieredPdfExtractor<'a> {
    structured: &'a Arc<dyn PdfMarkdownConverter>,
    ocr: Option<&'a OcrClient>,
    config: &'a ExtractionConfig,
}

impl<'a> TieredPdfExtractor<'a> {
    pub fn new(
        structured: &'a Arc<dyn PdfMarkdownConverter>,
        ocr: Option<&'a OcrClient>,
        config: &'a ExtractionConfig,
    ) -> Self {
        Self {
            structured,
            ocr,
            config,
        }
    }

    /// Classify `pdf` and run tiers until one yields text.
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    pub async fn extract(
        &self,
        pdf: &[u8],
        preserve_layout: bool,
        ocr_request: &OcrRequest,
    ) -> Result<PdfExtraction> {
        let signals = scanner::inspect_prefix(pdf, self.config.scan_prefix_bytes);
        let kind = signals.classify(self.config.uncertain_pdf_policy);
        info!(
            ?kind,
            text_operators = signals.has_text_operators,
            image_markers = signals.has_image_markers,
            "PDF classified"
        );

        let mut warnings = Vec::new();
        for tier in PdfTier::order(kind, self.config.structured_first) {
            match self.attempt(tier, pdf, preserve_layout, ocr_request).await {
                TierOutcome::Produced(output) => {
                    info!(tier = tier.label(), chars = output.markdown.len(), "Tier produced text");
                    warnings.extend(output.warnings);
                    let estimated_pages =
                        estimate_pages(pdf, &output.markdown, self.config.words_per_page);
                    return Ok(PdfExtraction {
                        kind,
                        tier,
                        markdown: output.markdown,
                        html: output.html,
                        confidence: output.confidence,
                        estimated_pages,
                        warnings,
                    });
                }
                TierOutcome::Failed(reason) => {
                    warn!(tier = tier.label(), %reason, "Tier failed");
                    warnings.push(reason);
                }
            }
        }

        Err(FolioError::ExtractionFailed {
            reason: "no text could be recovered from the PDF by any method".into(),
            warnings,
        })
    }

    async fn attempt(
        &self,
        tier: PdfTier,
        pdf: &[u8],
        preserve_layout: bool,
        ocr_request: &OcrRequest,
    ) -> TierOutcome {
        match tier {
            PdfTier::NativeScanner => match scanner::scan_text(pdf, preserve_layout) {
                Some(text) => TierOutcome::Produced(TierOutput {
                    markdown: text,
                    html: None,
                    confidence: None,
                    warnings: Vec::new(),
                }),
                None => TierOutcome::Failed(
                    "Content-stream scan found no extractable text".to_string(),
                ),
            },
            PdfTier::StructuredConverter => {
                let converter = Arc::clone(self.structured);
                let name = converter.name().to_string();
                let bytes = pdf.to_vec();
                match run_blocking(move || converter.convert(&bytes)).await {
                    Ok(markdown) if !markdown.trim().is_empty() => {
                        TierOutcome::Produced(TierOutput {
                            markdown: markdown.trim().to_string(),
                            html: None,
                            confidence: None,
                            warnings: Vec::new(),
                        })
                    }
                    Ok(_) => TierOutcome::Failed(format!(
                        "Structured conversion ({name}) returned no text"
                    )),
                    Err(err) => {
                        TierOutcome::Failed(format!("Structured conversion ({name}) failed: {err}"))
                    }
                }
            }
            PdfTier::Ocr => {
                let output = run_ocr(self.ocr, pdf, ocr_request).await;
                if output.is_empty() {
                    let detail = if output.warnings.is_empty() {
                        "OCR produced no text".to_string()
                    } else {
                        output.warnings.join("; ")
                    };
                    TierOutcome::Failed(detail)
                } else {
                    TierOutcome::Produced(TierOutput {
                        markdown: output.markdown,
                        html: Some(output.html),
                        confidence: Some(output.confidence),
                        warnings: output.warnings,
                    })
                }
            }
        }
    }
}

/// `/Type /Page` objects when present, else words divided by `words_per_page`.
pub fn estimate_pages(pdf: &[u8], markdown: &str, words_per_page: usize) -> u32 {
    let pages = scanner::count_page_objects(pdf);
    if pages > 0 {
        debug!(pages, "Page count from page objects");
        return u32::try_from(pages).unwrap_or(u32::MAX);
    }
    pages_from_words(markdown.split_whitespace().count(), words_per_page)
}
