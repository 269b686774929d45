// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream text scanner — recovers literal text runs straight from the
// raw PDF bytes, without building an object graph.
//
// Recognised show-text forms:
//   (literal) Tj      (literal) '      aw ac (literal) "
//   <hex> Tj          [ (a) -250 (b) <63> ] TJ
//
// FlateDecode content streams are inflated and scanned in place; everything
// else is scanned as-is. This is deliberately lightweight: no font maps, no
// positioning, so CID-keyed text comes out as noise and is filtered.

use std::io::Read;
use std::sync::LazyLock;

use flate2::read::ZlibDecoder;
use regex::bytes::Regex;
use tracing::debug;

use folio_core::config::UncertainPdfPolicy;

/// Literal strings longer than this are treated as binary noise.
const MAX_LITERAL_LEN: usize = 8 * 1024;

/// A `TJ` adjustment at or below this (thousandths of an em) reads as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

static TEXT_SHOW_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)\((?:[^()\\]|\\.)*\)\s*Tj|\[[^\]]*\]\s*TJ").expect("valid regex")
});

static IMAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Subtype\s*/Image|/XObject").expect("valid regex"));

static IMAGE_SUBTYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Subtype\s*/Image").expect("valid regex"));

static PAGE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").expect("valid regex"));

static HORIZONTAL_RUN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"[ \t]+").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\n{3,}").expect("valid regex"));

/// Whether a PDF carries real text or only page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfKind {
    Digital,
    Scanned,
}

/// Markers found in the inspected prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PdfSignals {
    pub has_text_operators: bool,
    pub has_image_markers: bool,
}

impl PdfSignals {
    /// Text operators win over image markers; images alone mean a scan; no
    /// signal at all falls back to `policy`.
    pub fn classify(&self, policy: UncertainPdfPolicy) -> PdfKind {
        match (self.has_text_operators, self.has_image_markers) {
            (true, _) => PdfKind::Digital,
            (false, true) => PdfKind::Scanned,
            (false, false) => match policy {
                UncertainPdfPolicy::Scanned => PdfKind::Scanned,
                UncertainPdfPolicy::Digital => PdfKind::Digital,
            },
        }
    }
}

/// Look for text-show operators and image markers in the first `prefix_len` bytes.
pub fn inspect_prefix(pdf: &[u8], prefix_len: usize) -> PdfSignals {
    let prefix = &pdf[..pdf.len().min(prefix_len)];
    PdfSignals {
        has_text_operators: TEXT_SHOW_OPERATOR.is_match(prefix),
        has_image_markers: IMAGE_MARKER.is_match(prefix),
    }
}

/// Count `/Type /Page` objects (not `/Pages`).
pub fn count_page_objects(pdf: &[u8]) -> usize {
    PAGE_OBJECT.find_iter(pdf).count()
}

/// Recover and normalize the text of every show-text run.
///
/// Returns `None` when nothing usable was found.
pub fn scan_text(pdf: &[u8], preserve_layout: bool) -> Option<String> {
    let runs = scan_runs(pdf);
    debug!(runs = runs.len(), "content-stream runs recovered");
    let normalized = normalize_runs(&runs.join("\n"), preserve_layout);
    if normalized.is_empty() { None } else { Some(normalized) }
}

/// Every decoded run, in byte order. Inflated stream bodies are scanned where
/// the compressed body sits.
pub fn scan_runs(pdf: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for stream in find_streams(pdf) {
        scan_segment(&pdf[cursor..stream.start], &mut runs);
        if stream.flate && !stream.image {
            if let Some(inflated) = inflate(&pdf[stream.start..stream.end]) {
                scan_segment(&inflated, &mut runs);
            }
        } else if !stream.image {
            scan_segment(&pdf[stream.start..stream.end], &mut runs);
        }
        cursor = stream.end;
    }
    scan_segment(&pdf[cursor..], &mut runs);

    runs
}

/// Collapse horizontal whitespace (unless `preserve_layout`), collapse 3+
/// newlines to 2, and trim.
pub fn normalize_runs(text: &str, preserve_layout: bool) -> String {
    let text = if preserve_layout {
        text.to_string()
    } else {
        HORIZONTAL_RUN.replace_all(text, " ").into_owned()
    };
    EXCESS_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}

// -- Stream location --------------------------------------------------------

#[derive(Debug)]
struct StreamSpan {
    start: usize,
    end: usize,
    flate: bool,
    image: bool,
}

fn find_streams(pdf: &[u8]) -> Vec<StreamSpan> {
    let mut spans = Vec::new();
    let mut from = 0;

    while let Some(rel) = find(&pdf[from..], b"stream") {
        let keyword = from + rel;
        // Skip the tail of "endstream".
        if keyword >= 3 && &pdf[keyword - 3..keyword] == b"end" {
            from = keyword + 6;
            continue;
        }
        let mut start = keyword + 6;
        if pdf.get(start) == Some(&b'\r') {
            start += 1;
        }
        if pdf.get(start) != Some(&b'\n') {
            from = keyword + 6;
            continue;
        }
        start += 1;

        let Some(end_rel) = find(&pdf[start..], b"endstream") else {
            break;
        };
        let end = start + end_rel;

        let dict_from = keyword.saturating_sub(1024);
        let dict_window = &pdf[dict_from..keyword];
        let dict = match rfind(dict_window, b"obj") {
            Some(pos) => &dict_window[pos..],
            None => dict_window,
        };

        spans.push(StreamSpan {
            start,
            end,
            flate: find(dict, b"/FlateDecode").is_some(),
            image: IMAGE_SUBTYPE.is_match(dict),
        });
        from = end + 9;
    }

    spans
}

fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Some(out),
        // Truncated streams still yield whatever inflated cleanly.
        Err(_) if !out.is_empty() => Some(out),
        Err(_) => None,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

// -- Operator scanning ------------------------------------------------------

fn scan_segment(data: &[u8], runs: &mut Vec<String>) {
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'(' => {
                let Some((bytes, end)) = parse_literal(data, i) else {
                    i += 1;
                    continue;
                };
                if matches!(next_operator(data, end), Some(b"Tj" | b"'" | b"\"")) {
                    push_run(runs, &bytes);
                }
                i = end;
            }
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let Some((bytes, end)) = parse_hex(data, i) else {
                    i += 1;
                    continue;
                };
                if matches!(next_operator(data, end), Some(b"Tj" | b"'" | b"\"")) {
                    push_run(runs, &bytes);
                }
                i = end;
            }
            b'<' => i += 2,
            b'[' => {
                let Some((bytes, end)) = parse_kerned_array(data, i) else {
                    i += 1;
                    continue;
                };
                if matches!(next_operator(data, end), Some(b"TJ")) {
                    push_run(runs, &bytes);
                }
                i = end;
            }
            _ => i += 1,
        }
    }
}

/// Operator token following an operand that ended at `pos`.
fn next_operator(data: &[u8], pos: usize) -> Option<&[u8]> {
    let mut start = pos;
    while start < data.len() && data[start].is_ascii_whitespace() {
        start += 1;
    }
    let mut end = start;
    while end < data.len() && (data[end].is_ascii_alphabetic() || matches!(data[end], b'\'' | b'"'))
    {
        end += 1;
    }
    (end > start).then(|| &data[start..end])
}

/// Parse a literal string opening at `open`; returns decoded bytes and the
/// index just past the closing parenthesis. Balanced inner parentheses are
/// part of the string.
fn parse_literal(data: &[u8], open: usize) -> Option<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut depth = 1usize;
    let mut i = open + 1;

    while i < data.len() {
        if i - open > MAX_LITERAL_LEN {
            return None;
        }
        match data[i] {
            b'\\' => {
                i += 1;
                let Some(&escaped) = data.get(i) else { break };
                match escaped {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'(' | b')' | b'\\' => out.push(escaped),
                    b'0'..=b'7' => {
                        let mut value: u32 = 0;
                        let mut digits = 0;
                        while digits < 3 && i < data.len() && (b'0'..=b'7').contains(&data[i]) {
                            value = value * 8 + u32::from(data[i] - b'0');
                            digits += 1;
                            i += 1;
                        }
                        out.push((value & 0xFF) as u8);
                        continue;
                    }
                    // Line continuation.
                    b'\r' => {
                        if data.get(i + 1) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                }
                i += 1;
            }
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((out, i + 1));
                }
                out.push(b')');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    None
}

/// Parse `<48656C6C6F>`; an odd trailing digit is padded with zero.
fn parse_hex(data: &[u8], open: usize) -> Option<(Vec<u8>, usize)> {
    let mut nibbles = Vec::new();
    let mut i = open + 1;
    while i < data.len() {
        let byte = data[i];
        if byte == b'>' {
            if nibbles.len() % 2 == 1 {
                nibbles.push(0);
            }
            let bytes = nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect();
            return Some((bytes, i + 1));
        }
        if byte.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let nibble = (byte as char).to_digit(16)? as u8;
        nibbles.push(nibble);
        if nibbles.len() > MAX_LITERAL_LEN {
            return None;
        }
        i += 1;
    }
    None
}

/// Parse a `TJ` operand array; strings are concatenated and large negative
/// adjustments become a space.
fn parse_kerned_array(data: &[u8], open: usize) -> Option<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut i = open + 1;

    while i < data.len() {
        match data[i] {
            b']' => return Some((out, i + 1)),
            b'(' => {
                let (bytes, end) = parse_literal(data, i)?;
                out.extend_from_slice(&bytes);
                i = end;
            }
            b'<' => {
                let (bytes, end) = parse_hex(data, i)?;
                out.extend_from_slice(&bytes);
                i = end;
            }
            b'-' | b'+' | b'.' | b'0'..=b'9' => {
                let start = i;
                while i < data.len() && matches!(data[i], b'-' | b'+' | b'.' | b'0'..=b'9') {
                    i += 1;
                }
                let adjustment = std::str::from_utf8(&data[start..i])
                    .ok()
                    .and_then(|s| s.parse::<f32>().ok())
                    .unwrap_or(0.0);
                if adjustment <= TJ_SPACE_THRESHOLD && !out.ends_with(b" ") {
                    out.push(b' ');
                }
            }
            byte if byte.is_ascii_whitespace() => i += 1,
            // Anything else means this is not a TJ array.
            _ => return None,
        }
        if i - open > MAX_LITERAL_LEN {
            return None;
        }
    }
    None
}

fn push_run(runs: &mut Vec<String>, bytes: &[u8]) {
    let text = decode_pdf_string(bytes);
    let total = text.chars().count();
    if total == 0 {
        return;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .count();
    // Mostly control characters means CID glyph ids, not text.
    if printable * 2 < total {
        return;
    }
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();
    if !cleaned.trim().is_empty() {
        runs.push(cleaned);
    }
}

/// UTF-16BE when the string carries a byte-order mark, else one char per byte.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
