// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format routing — decides which extraction path a buffer takes.
//
// Order: a recognised extension/MIME hint is trusted; otherwise magic bytes
// and container markers are sniffed; otherwise valid UTF-8 text is plain
// text. Known formats this pipeline cannot read are rejected up front.

use tracing::{debug, instrument};

use folio_core::error::{FolioError, Result};
use folio_core::types::{DocumentFormat, RawDocument};

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const TIFF_LE_MAGIC: &[u8] = b"II*\x00";
const TIFF_BE_MAGIC: &[u8] = b"MM\x00*";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// `%PDF` may be preceded by junk; readers accept it within the first KiB.
const PDF_HEADER_WINDOW: usize = 1024;

/// How much of the buffer is checked when deciding whether it is text.
const TEXT_SNIFF_WINDOW: usize = 8 * 1024;

const UNSUPPORTED_EXTENSIONS: &[&str] = &[
    "doc", "dot", "rtf", "odt", "ott", "pages", "xls", "xlsx", "ods", "ppt", "pptx", "odp", "epub",
    "mobi", "azw", "azw3",
];

const UNSUPPORTED_MIME_MARKERS: &[&str] = &[
    "application/msword",
    "application/rtf",
    "text/rtf",
    "application/vnd.ms-",
    "application/vnd.oasis.opendocument",
    "application/epub+zip",
    "application/vnd.openxmlformats-officedocument.spreadsheetml",
    "application/vnd.openxmlformats-officedocument.presentationml",
];

/// Tag `bytes` with its format, honouring `hint` when it names a format.
#[instrument(skip_all, fields(bytes_len = bytes.len(), hint = hint.unwrap_or("")))]
pub fn route<'a>(bytes: &'a [u8], hint: Option<&str>) -> Result<RawDocument<'a>> {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        if let Some(format) = format_from_hint(hint)? {
            debug!(%format, "Format taken from hint");
            return Ok(RawDocument::new(bytes, format));
        }
        debug!(hint, "Unrecognised hint; sniffing content");
    }
    let format = sniff(bytes)?;
    debug!(%format, "Format sniffed from content");
    Ok(RawDocument::new(bytes, format))
}

/// `Ok(None)` for hints that name nothing we know.
fn format_from_hint(hint: &str) -> Result<Option<DocumentFormat>> {
    let lowered = hint.to_ascii_lowercase();

    if lowered.contains('/') {
        if let Some(format) = DocumentFormat::from_mime(&lowered) {
            return Ok(Some(format));
        }
        if UNSUPPORTED_MIME_MARKERS.iter().any(|m| lowered.starts_with(m)) {
            return Err(FolioError::UnsupportedFormat(format!("MIME type {hint}")));
        }
        return Ok(None);
    }

    let extension = lowered.rsplit('.').next().unwrap_or(&lowered);
    if let Some(format) = DocumentFormat::from_extension(extension) {
        return Ok(Some(format));
    }
    if UNSUPPORTED_EXTENSIONS.contains(&extension) {
        return Err(FolioError::UnsupportedFormat(format!(".{extension} files")));
    }
    Ok(None)
}

/// Classify by content alone.
pub fn sniff(bytes: &[u8]) -> Result<DocumentFormat> {
    if bytes.is_empty() {
        return Err(FolioError::UnsupportedFormat("empty input".into()));
    }

    let header = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    if header.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Ok(DocumentFormat::Pdf);
    }

    if bytes.starts_with(ZIP_MAGIC) {
        return if contains(bytes, b"word/") {
            Ok(DocumentFormat::Docx)
        } else {
            Err(FolioError::UnsupportedFormat(
                "ZIP archive that is not a word-processor document".into(),
            ))
        };
    }

    if bytes.starts_with(OLE_MAGIC) {
        return Err(FolioError::UnsupportedFormat(
            "legacy binary word-processor file (.doc)".into(),
        ));
    }

    if [PNG_MAGIC, JPEG_MAGIC, TIFF_LE_MAGIC, TIFF_BE_MAGIC]
        .iter()
        .any(|magic| bytes.starts_with(magic))
    {
        return Ok(DocumentFormat::Image);
    }

    let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if looks_like_text(text) {
        let start = String::from_utf8_lossy(&text[..text.len().min(512)])
            .trim_start()
            .to_ascii_lowercase();
        if start.starts_with("<!doctype html") || start.starts_with("<html") {
            return Ok(DocumentFormat::Html);
        }
        return Ok(DocumentFormat::Plain);
    }

    Err(FolioError::UnsupportedFormat("unrecognised binary data".into()))
}

/// UTF-8 with no NUL bytes in the sniff window. A multi-byte character cut by
/// the window edge still counts as text.
fn looks_like_text(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(TEXT_SNIFF_WINDOW)];
    if window.contains(&0) {
        return false;
    }
    match std::str::from_utf8(window) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none() && window.len() < bytes.len(),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
