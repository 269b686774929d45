// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};
use crate::types::Locale;

/// How a PDF is classified when its prefix shows neither text-show operators
/// nor image markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UncertainPdfPolicy {
    /// Route to OCR. Safe, but slow for digital PDFs with unusual encodings.
    #[default]
    Scanned,
    Digital,
}

/// Pipeline-wide settings. Per-call [`ExtractOptions`](crate::ExtractOptions)
/// override the matching fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Bytes of the PDF inspected by the scanned-vs-digital heuristic.
    pub scan_prefix_bytes: usize,
    pub uncertain_pdf_policy: UncertainPdfPolicy,
    /// Try the structured converter before the content-stream scanner.
    pub structured_first: bool,
    /// Default bound on one OCR invocation.
    pub ocr_timeout_ms: u64,
    /// OCR runs longer than this get an advisory "large document" warning.
    pub large_document_warning_ms: u64,
    pub low_confidence_threshold: f32,
    /// Divisor for the word-count page estimate.
    pub words_per_page: usize,
    pub default_languages: Vec<String>,
    pub detect_headings: bool,
    pub detect_lists: bool,
    /// Permits on the OCR session semaphore.
    pub max_concurrent_ocr_sessions: usize,
    pub locale: Locale,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scan_prefix_bytes: 50 * 1024,
            uncertain_pdf_policy: UncertainPdfPolicy::Scanned,
            structured_first: false,
            ocr_timeout_ms: 120_000,
            large_document_warning_ms: 30_000,
            low_confidence_threshold: 0.5,
            words_per_page: 250,
            default_languages: vec!["eng".to_string()],
            detect_headings: false,
            detect_lists: false,
            max_concurrent_ocr_sessions: 1,
            locale: Locale::En,
        }
    }
}

impl ExtractionConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.scan_prefix_bytes == 0 {
            return Err(FolioError::Config("scan_prefix_bytes must be positive".into()));
        }
        if self.words_per_page == 0 {
            return Err(FolioError::Config("words_per_page must be positive".into()));
        }
        if self.max_concurrent_ocr_sessions == 0 {
            return Err(FolioError::Config(
                "max_concurrent_ocr_sessions must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(FolioError::Config(format!(
                "low_confidence_threshold {} is outside [0, 1]",
                self.low_confidence_threshold
            )));
        }
        if self.ocr_timeout_ms == 0 {
            return Err(FolioError::Config("ocr_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }

    pub fn large_document_budget(&self) -> Duration {
        Duration::from_millis(self.large_document_warning_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ExtractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_prefix_bytes, 51_200);
        assert_eq!(config.uncertain_pdf_policy, UncertainPdfPolicy::Scanned);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"locale": "es", "detect_headings": true}}"#).unwrap();

        let config = ExtractionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.locale, Locale::Es);
        assert!(config.detect_headings);
        assert_eq!(config.words_per_page, 250);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let config = ExtractionConfig {
            low_confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FolioError::Config(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = ExtractionConfig::load_from_file("/nonexistent/folio.json");
        assert!(matches!(result, Err(FolioError::Io(_))));
    }
}
