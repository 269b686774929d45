// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio extraction pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one extraction call (correlates log lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractionId(pub Uuid);

impl ExtractionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExtractionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExtractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input formats the pipeline can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Office Open XML word-processor package.
    Docx,
    Pdf,
    /// Plain text or Markdown.
    Plain,
    Html,
    /// Raster image of a scanned page (PNG, JPEG, TIFF).
    Image,
}

impl DocumentFormat {
    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pdf => "application/pdf",
            Self::Plain => "text/plain",
            Self::Html => "text/html",
            Self::Image => "image/*",
        }
    }

    /// Infer the format from a file extension (with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" | "markdown" => Some(Self::Plain),
            "html" | "htm" | "xhtml" => Some(Self::Html),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }

    /// Infer the format from a MIME type, ignoring parameters such as `charset`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "application/pdf" | "application/x-pdf" => Some(Self::Pdf),
            "text/plain" | "text/markdown" | "text/x-markdown" => Some(Self::Plain),
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "image/png" | "image/jpeg" | "image/jpg" | "image/tiff" => Some(Self::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Plain => "plain",
            Self::Html => "html",
            Self::Image => "image",
        };
        f.write_str(name)
    }
}

/// A manuscript buffer with its routed format. Borrowed for one extraction call.
#[derive(Debug, Clone, Copy)]
pub struct RawDocument<'a> {
    pub bytes: &'a [u8],
    pub format: DocumentFormat,
}

impl<'a> RawDocument<'a> {
    pub fn new(bytes: &'a [u8], format: DocumentFormat) -> Self {
        Self { bytes, format }
    }
}

/// Which strategy produced the final content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConverterKind {
    /// Content-stream text scanner over the raw PDF bytes.
    NativeScanner,
    /// External structured PDF-to-Markdown converter.
    StructuredConverter,
    Ocr,
    /// Word-processor or HTML input rewritten by the HTML→Markdown transducer.
    HtmlTransducer,
    /// Plain text taken as Markdown.
    PlainText,
}

/// Diagnostics about how a result was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub extraction_id: ExtractionId,
    pub converter_used: ConverterKind,
    pub processing_time_ms: u64,
    pub is_scanned: bool,
    /// Recognition confidence in `[0, 1]`; present on the OCR path only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub extracted_at: DateTime<Utc>,
    /// SHA-256 of the source bytes.
    pub source_sha256: String,
}

/// One heading-introduced section of the manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    /// Heading depth, 1 (top) to 6.
    pub level: u8,
    pub markdown: String,
    pub html: String,
    pub word_count: usize,
}

/// Content preceding the first heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preface {
    pub title: String,
    pub content: String,
}

/// Final normalized output of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub format: DocumentFormat,
    pub text: String,
    pub html: String,
    pub markdown: String,
    pub estimated_pages: u32,
    pub chapters: Vec<Chapter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preface: Option<Preface>,
    pub warnings: Vec<String>,
    pub metadata: ExtractionMetadata,
}

/// Per-call hint; every field overrides the matching [`ExtractionConfig`](crate::ExtractionConfig) default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractOptions {
    /// Declared format: a file extension, a file name, or a MIME type.
    pub format: Option<String>,
    /// OCR languages (engine-specific codes such as `eng`, `spa`).
    pub languages: Option<Vec<String>>,
    /// Keep intra-line spacing instead of collapsing it.
    pub preserve_layout: bool,
    pub detect_headings: Option<bool>,
    pub detect_lists: Option<bool>,
    /// Bound on one OCR invocation.
    pub timeout_ms: Option<u64>,
}

impl ExtractOptions {
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }
}

/// Locale of user-facing fallback labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    /// Title given to a preface that has no usable first line.
    pub fn preface_label(&self) -> &'static str {
        match self {
            Self::En => "Introduction",
            Self::Es => "Introducción",
        }
    }
}
