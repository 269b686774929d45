// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction result aggregation — merges HTML- and Markdown-sourced chapter
// drafts and assembles the final `ExtractionResult`.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use folio_core::types::{
    Chapter, ConverterKind, DocumentFormat, ExtractionId, ExtractionMetadata, ExtractionResult,
    Preface,
};

use crate::html::html_to_markdown;
use crate::markdown::{markdown_to_html, markdown_to_text};
use crate::structure::count_words;

/// A chapter as seen by one source. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterDraft {
    pub title: Option<String>,
    pub level: Option<u8>,
    pub markdown: Option<String>,
    pub html: Option<String>,
}

impl From<&Chapter> for ChapterDraft {
    /// Markdown-sourced view of a segmented chapter; its rendered HTML is not
    /// carried so converter HTML wins where it exists.
    fn from(chapter: &Chapter) -> Self {
        Self {
            title: Some(chapter.title.clone()).filter(|t| !t.is_empty()),
            level: Some(chapter.level),
            markdown: Some(chapter.markdown.clone()),
            html: None,
        }
    }
}

/// Pair each Markdown draft with the next unused HTML draft that has the same
/// level and title. The result runs parallel to `markdown_drafts`: unpaired
/// Markdown drafts get an empty partner and unpaired HTML drafts are dropped.
pub fn align_drafts(html_drafts: &[ChapterDraft], markdown_drafts: &[ChapterDraft]) -> Vec<ChapterDraft> {
    let mut remaining = html_drafts;
    let aligned: Vec<ChapterDraft> = markdown_drafts
        .iter()
        .map(|md| match remaining.iter().position(|html| same_heading(html, md)) {
            Some(pos) => {
                let paired = remaining[pos].clone();
                remaining = &remaining[pos + 1..];
                paired
            }
            None => ChapterDraft::default(),
        })
        .collect();

    let paired = aligned.iter().filter(|draft| draft.html.is_some()).count();
    if paired < html_drafts.len() {
        debug!(
            unpaired = html_drafts.len() - paired,
            "HTML chapter drafts without a Markdown counterpart dropped"
        );
    }
    aligned
}

fn same_heading(a: &ChapterDraft, b: &ChapterDraft) -> bool {
    let normalized = |title: &Option<String>| {
        title
            .as_deref()
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
    };
    a.level == b.level && a.title.is_some() && normalized(&a.title) == normalized(&b.title)
}

/// Merge drafts already paired by `align_drafts`, HTML fields first.
///
/// A missing Markdown body is transduced from the HTML, a missing HTML body is
/// rendered from the Markdown, and a chapter with no title from either source
/// becomes `Section N`.
pub fn merge_chapters(html_drafts: &[ChapterDraft], markdown_drafts: &[ChapterDraft]) -> Vec<Chapter> {
    let count = html_drafts.len().max(markdown_drafts.len());
    let empty = ChapterDraft::default();

    let chapters: Vec<Chapter> = (0..count)
        .map(|i| {
            let from_html = html_drafts.get(i).unwrap_or(&empty);
            let from_markdown = markdown_drafts.get(i).unwrap_or(&empty);

            let title = from_html
                .title
                .clone()
                .or_else(|| from_markdown.title.clone())
                .unwrap_or_else(|| format!("Section {}", i + 1));
            let level = from_html.level.or(from_markdown.level).unwrap_or(1).clamp(1, 6);

            let markdown = from_html
                .markdown
                .clone()
                .or_else(|| from_markdown.markdown.clone())
                .or_else(|| from_html.html.as_deref().map(html_to_markdown))
                .unwrap_or_default();
            let html = from_html
                .html
                .clone()
                .or_else(|| from_markdown.html.clone())
                .unwrap_or_else(|| markdown_to_html(&markdown));

            Chapter {
                title,
                level,
                word_count: count_words(&markdown),
                markdown,
                html,
            }
        })
        .collect();

    debug!(
        html_drafts = html_drafts.len(),
        markdown_drafts = markdown_drafts.len(),
        chapters = chapters.len(),
        "Chapters merged"
    );
    chapters
}

/// `ceil(words / words_per_page)`; zero words is zero pages.
pub fn pages_from_words(words: usize, words_per_page: usize) -> u32 {
    let pages = words.div_ceil(words_per_page.max(1));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Everything the pipeline learned about one document.
#[derive(Debug, Clone)]
pub struct ResultParts {
    pub extraction_id: ExtractionId,
    pub format: DocumentFormat,
    pub markdown: String,
    /// Falls back to rendering `markdown` when absent.
    pub html: Option<String>,
    pub chapters: Vec<Chapter>,
    pub preface: Option<Preface>,
    /// Falls back to a word-based estimate when absent.
    pub estimated_pages: Option<u32>,
    pub warnings: Vec<String>,
    pub converter_used: ConverterKind,
    pub is_scanned: bool,
    pub confidence: Option<f32>,
    pub source_sha256: String,
    pub started: Instant,
}

/// Build the immutable result handed back to the caller.
pub fn assemble(parts: ResultParts, words_per_page: usize) -> ExtractionResult {
    let text = markdown_to_text(&parts.markdown);
    let html = parts
        .html
        .unwrap_or_else(|| markdown_to_html(&parts.markdown));
    let estimated_pages = parts
        .estimated_pages
        .unwrap_or_else(|| pages_from_words(count_words(&parts.markdown), words_per_page));
    let processing_time_ms = u64::try_from(parts.started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        extraction_id = %parts.extraction_id,
        format = %parts.format,
        converter = ?parts.converter_used,
        chapters = parts.chapters.len(),
        warnings = parts.warnings.len(),
        processing_time_ms,
        "Extraction result assembled"
    );

    ExtractionResult {
        format: parts.format,
        text,
        html,
        markdown: parts.markdown,
        estimated_pages,
        chapters: parts.chapters,
        preface: parts.preface,
        warnings: parts.warnings,
        metadata: ExtractionMetadata {
            extraction_id: parts.extraction_id,
            converter_used: parts.converter_used,
            processing_time_ms,
            is_scanned: parts.is_scanned,
            confidence: parts.confidence,
            extracted_at: Utc::now(),
            source_sha256: parts.source_sha256,
        },
    }
}
