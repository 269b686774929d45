// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for authors uploading manuscripts.
//
// Every technical error is mapped to plain language with a clear suggestion.
// The severity drives how the editor (or the CLI) presents it.

use crate::error::FolioError;

/// Severity of an error from the author's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again as-is (engine hiccup, timeout).
    Transient,
    /// The author must do something (re-export the file, fix a setting).
    ActionRequired,
    /// The file cannot be used in its current form.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the author should try (shown as body text).
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `FolioError` into a `HumanError` an author can act on.
pub fn humanize_error(err: &FolioError) -> HumanError {
    match err {
        FolioError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file can't be imported.".into(),
            suggestion: format!(
                "Save the manuscript as .docx or .pdf and upload it again. (File type: {detail})"
            ),
            severity: Severity::Permanent,
        },

        FolioError::ExtractionFailed { warnings, .. } => {
            let scanned = warnings.iter().any(|w| w.contains("OCR"));
            HumanError {
                message: "We couldn't find any text in this file.".into(),
                suggestion: if scanned {
                    "If this is a scan, rescan it at a higher resolution with the pages straight and well lit.".into()
                } else {
                    "The file may be empty or protected. Open it in your word processor and export it again.".into()
                },
                severity: Severity::ActionRequired,
            }
        }

        FolioError::Conversion(_) => HumanError {
            message: "The document converter couldn't read this file.".into(),
            suggestion: "The file may be damaged. Open it in your word processor and save a fresh copy.".into(),
            severity: Severity::ActionRequired,
        },

        FolioError::Pdf(_) => HumanError {
            message: "There's a problem with this PDF file.".into(),
            suggestion: "The file may be damaged. Try exporting the PDF again from the original document.".into(),
            severity: Severity::Permanent,
        },

        FolioError::Ocr(_) => HumanError {
            message: "Text recognition didn't work on this scan.".into(),
            suggestion: "Try again. If it keeps failing, rescan with better lighting and the text in focus.".into(),
            severity: Severity::Transient,
        },

        FolioError::CollaboratorUnavailable(name) => HumanError {
            message: "This kind of import isn't available here.".into(),
            suggestion: format!("The {name} is not installed. Ask your administrator to enable it."),
            severity: Severity::Permanent,
        },

        FolioError::Config(detail) => HumanError {
            message: "The import settings are invalid.".into(),
            suggestion: format!("Fix the configuration and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        FolioError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "We don't have permission to read that file.".into(),
                suggestion: "Check the file permissions, or copy the file somewhere else first.".into(),
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading the file.".into(),
                suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                severity: Severity::Transient,
            },
        },

        FolioError::Serialization(_) => HumanError {
            message: "The import settings file couldn't be read.".into(),
            suggestion: "Check that the settings file is valid JSON.".into(),
            severity: Severity::ActionRequired,
        },
    }
}
