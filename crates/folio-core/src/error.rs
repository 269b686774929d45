// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Routing --
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    // -- Extraction --
    #[error("extraction failed: {reason} ({} warning(s) recorded)", warnings.len())]
    ExtractionFailed {
        reason: String,
        warnings: Vec<String>,
    },

    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("{0} is not available in this build")]
    CollaboratorUnavailable(&'static str),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    /// Warnings accumulated before the failure, if any.
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::ExtractionFailed { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failed_reports_warning_count() {
        let err = FolioError::ExtractionFailed {
            reason: "no tier produced text".into(),
            warnings: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "extraction failed: no tier produced text (2 warning(s) recorded)"
        );
        assert_eq!(err.warnings().len(), 2);
    }

    #[test]
    fn other_variants_carry_no_warnings() {
        let err = FolioError::UnsupportedFormat("xlsx".into());
        assert!(err.warnings().is_empty());
    }
}
