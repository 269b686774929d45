// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR post-processing — artifact cleanup, opt-in heading/list heuristics,
// line-by-line rendering to Markdown and HTML, and confidence diagnostics.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::markdown::escape_html;

static PIPE_AFTER_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{L})\|").expect("valid regex"));

static PIPE_BEFORE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\|(\p{L})").expect("valid regex"));

static SPLIT_LETTER_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z]) ([A-Za-z])\b").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static SHOUTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Lu}[\p{Lu} ]{3,}$").expect("valid regex"));

static LIST_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-•*]|(\d+)\.)\s+(.+)$").expect("valid regex"));

/// Knobs for one post-processing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostProcessOptions {
    pub preserve_layout: bool,
    pub detect_headings: bool,
    pub detect_lists: bool,
    pub low_confidence_threshold: f32,
    pub large_document_budget: Duration,
}

/// Cleaned OCR output with its advisory warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub markdown: String,
    pub html: String,
    /// Normalised to `[0, 1]`.
    pub confidence: f32,
    pub warnings: Vec<String>,
}

impl OcrOutput {
    /// Zero-confidence result standing in for a failed recognition.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            markdown: String::new(),
            html: String::new(),
            confidence: 0.0,
            warnings: vec![reason.into()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

/// Engines report either a fraction or a percentage.
pub fn normalize_confidence(raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    fraction.clamp(0.0, 1.0)
}

/// Fix `|`-for-`l` confusions, rejoin split letter pairs (unless
/// `preserve_layout`), trim line ends, and collapse blank-line runs.
pub fn clean_artifacts(raw: &str, preserve_layout: bool) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = PIPE_AFTER_LETTER.replace_all(&text, "${1}l");
    let text = PIPE_BEFORE_LETTER.replace_all(&text, "l${1}");
    let text = if preserve_layout {
        text.into_owned()
    } else {
        SPLIT_LETTER_PAIR.replace_all(&text, "${1}${2}").into_owned()
    };

    let trimmed: Vec<&str> = text.lines().map(str::trim_end).collect();
    EXCESS_NEWLINES
        .replace_all(&trimmed.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OcrLine {
    Blank,
    Heading(String),
    Item { number: Option<String>, text: String },
    Paragraph(String),
}

fn classify(line: &str, detect_headings: bool, detect_lists: bool) -> OcrLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return OcrLine::Blank;
    }
    if detect_headings && SHOUTED_LINE.is_match(trimmed) {
        return OcrLine::Heading(trimmed.to_string());
    }
    if detect_lists {
        if let Some(caps) = LIST_LINE.captures(trimmed) {
            return OcrLine::Item {
                number: caps.get(1).map(|m| m.as_str().to_string()),
                text: caps[2].trim().to_string(),
            };
        }
    }
    OcrLine::Paragraph(trimmed.to_string())
}

/// Render cleaned text line by line into `(markdown, html)`.
pub fn render(text: &str, detect_headings: bool, detect_lists: bool) -> (String, String) {
    let mut markdown = Vec::new();
    let mut html = Vec::new();
    let mut list: Vec<String> = Vec::new();
    let mut ordered = false;

    let flush = |list: &mut Vec<String>, ordered: bool, html: &mut Vec<String>| {
        if list.is_empty() {
            return;
        }
        let tag = if ordered { "ol" } else { "ul" };
        html.push(format!("<{tag}>{}</{tag}>", list.concat()));
        list.clear();
    };

    for line in text.lines() {
        match classify(line, detect_headings, detect_lists) {
            OcrLine::Blank => {
                flush(&mut list, ordered, &mut html);
                markdown.push(String::new());
            }
            OcrLine::Heading(title) => {
                flush(&mut list, ordered, &mut html);
                html.push(format!("<h1>{}</h1>", escape_html(&title)));
                markdown.push(format!("# {title}"));
            }
            OcrLine::Item { number, text } => {
                let is_ordered = number.is_some();
                if is_ordered != ordered {
                    flush(&mut list, ordered, &mut html);
                    ordered = is_ordered;
                }
                list.push(format!("<li>{}</li>", escape_html(&text)));
                markdown.push(match number {
                    Some(n) => format!("{n}. {text}"),
                    None => format!("- {text}"),
                });
            }
            OcrLine::Paragraph(text) => {
                flush(&mut list, ordered, &mut html);
                html.push(format!("<p>{}</p>", escape_html(&text)));
                markdown.push(text);
            }
        }
    }
    flush(&mut list, ordered, &mut html);

    let markdown = EXCESS_NEWLINES
        .replace_all(&markdown.join("\n"), "\n\n")
        .trim()
        .to_string();
    (markdown, html.join("\n"))
}

/// Full post-processing of one recognition.
pub fn post_process(raw_text: &str, raw_confidence: f32, elapsed: Duration, options: &PostProcessOptions) -> OcrOutput {
    let confidence = normalize_confidence(raw_confidence);
    let cleaned = clean_artifacts(raw_text, options.preserve_layout);
    let (markdown, html) = render(&cleaned, options.detect_headings, options.detect_lists);

    let mut warnings = Vec::new();
    if confidence < options.low_confidence_threshold {
        warnings.push(format!(
            "OCR confidence is low ({:.0}%); review the recognised text for errors",
            confidence * 100.0
        ));
    }
    if elapsed > options.large_document_budget {
        warnings.push(format!(
            "OCR took {:.1}s; large scanned documents are slow to process",
            elapsed.as_secs_f32()
        ));
    }

    OcrOutput {
        markdown,
        html,
        confidence,
        warnings,
    }
}

/// Share of whitespace-separated tokens that look like words or numbers.
/// Used as a confidence proxy by engines that report none.
pub fn token_plausibility(text: &str) -> f32 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let plausible = tokens
        .iter()
        .filter(|token| {
            let core = token.trim_matches(|c: char| c.is_ascii_punctuation());
            !core.is_empty()
                && core
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '\'' | '-' | '’'))
        })
        .count();
    plausible as f32 / tokens.len() as f32
}
