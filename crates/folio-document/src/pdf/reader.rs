// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — structured text and embedded-image access via the `lopdf`
// crate. Backs the structured-conversion tier and feeds page images to OCR.

use lopdf::{Dictionary, Document, Object};
use tracing::{debug, instrument, warn};

use folio_bridge::PdfMarkdownConverter;
use folio_core::error::{FolioError, Result};

/// Parsed PDF document.
///
/// Wraps `lopdf::Document` and exposes the two things extraction needs: the
/// text of each page and the image XObjects a scanner left behind.
pub struct PdfReader {
    document: Document,
}

/// Pixel data of one image XObject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedImage {
    /// A self-describing encoded image (`/DCTDecode` JPEG, `/JPXDecode`).
    Encoded(Vec<u8>),
    /// Decompressed 8-bit samples, row-major.
    Raw {
        width: u32,
        height: u32,
        components: u8,
        samples: Vec<u8>,
    },
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| FolioError::Pdf(format!("failed to load PDF from memory: {err}")))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the page tree.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Text -----------------------------------------------------------------

    /// Text of one page (1-indexed), as decoded by lopdf's font-aware extractor.
    pub fn page_text(&self, page_number: u32) -> Result<String> {
        self.document.extract_text(&[page_number]).map_err(|err| {
            FolioError::Pdf(format!("text extraction failed on page {page_number}: {err}"))
        })
    }

    /// Every page's text, pages separated by a blank line. Pages that fail to
    /// decode are skipped with a log line.
    pub fn markdown(&self) -> String {
        let mut pages = Vec::new();
        for page_number in self.document.get_pages().keys() {
            match self.page_text(*page_number) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        pages.push(text.to_string());
                    }
                }
                Err(err) => warn!(page_number, %err, "Skipping page"),
            }
        }
        pages.join("\n\n")
    }

    // -- Images ---------------------------------------------------------------

    /// Image XObjects in object order. Streams with unsupported filters or
    /// sample depths are skipped.
    pub fn images(&self) -> Vec<EmbeddedImage> {
        let mut images = Vec::new();
        for object in self.document.objects.values() {
            let Object::Stream(stream) = object else { continue };
            if !has_name(&stream.dict, b"Subtype", b"Image") {
                continue;
            }

            if filter_names(&stream.dict)
                .iter()
                .any(|f| f == b"DCTDecode" || f == b"JPXDecode")
            {
                images.push(EmbeddedImage::Encoded(stream.content.clone()));
                continue;
            }

            match raw_image(&stream.dict, stream) {
                Some(image) => images.push(image),
                None => debug!("Skipping image XObject with unsupported encoding"),
            }
        }
        debug!(count = images.len(), "Image XObjects collected");
        images
    }
}

fn raw_image(dict: &Dictionary, stream: &lopdf::Stream) -> Option<EmbeddedImage> {
    let width = integer(dict, b"Width")?;
    let height = integer(dict, b"Height")?;
    if integer(dict, b"BitsPerComponent").unwrap_or(8) != 8 {
        return None;
    }

    let samples = if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()?
    } else {
        stream.content.clone()
    };

    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 {
        return None;
    }
    let components = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) if name == b"DeviceGray" => 1,
        Ok(Object::Name(name)) if name == b"DeviceRGB" => 3,
        Ok(Object::Name(name)) if name == b"DeviceCMYK" => 4,
        _ => u8::try_from(samples.len() as u64 / pixels).ok()?,
    };
    if components == 0 || (samples.len() as u64) < pixels * u64::from(components) {
        return None;
    }

    Some(EmbeddedImage::Raw {
        width,
        height,
        components,
        samples,
    })
}

fn integer(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(value)) => u32::try_from(*value).ok(),
        _ => None,
    }
}

fn has_name(dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    matches!(dict.get(key), Ok(Object::Name(name)) if name == expected)
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| match f {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Structured PDF → Markdown converter backed by lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfMarkdownConverter;

impl PdfMarkdownConverter for LopdfMarkdownConverter {
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    fn convert(&self, pdf: &[u8]) -> Result<String> {
        let reader = PdfReader::from_bytes(pdf)?;
        let markdown = reader.markdown();
        debug!(pages = reader.page_count(), chars = markdown.len(), "Structured conversion done");
        Ok(markdown)
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}
