// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural extraction — heading-driven segmentation of Markdown into an
// ordered chapter list plus an optional preface, and the equivalent split of
// converter HTML on `<h1>`–`<h6>`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use folio_core::types::{Chapter, Locale, Preface};

use crate::aggregate::ChapterDraft;
use crate::html::transducer::{flattened_spans, heading_title};
use crate::markdown::{markdown_to_html, markdown_to_text, HEADING_LINE};

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid regex"));

static NUMERIC_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)*\.\s+").expect("valid regex"));

static MARKDOWN_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([*_{}\[\]()#+\-.!<>~|])").expect("valid regex"));

static HTML_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").expect("valid regex")
});

static BODY_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>|</html\s*>").expect("valid regex"));

/// Preface plus chapters of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentStructure {
    pub preface: Option<Preface>,
    pub chapters: Vec<Chapter>,
}

/// Section being accumulated.
struct OpenSection<'a> {
    level: u8,
    title: String,
    lines: Vec<&'a str>,
}

impl OpenSection<'_> {
    fn close(self) -> Chapter {
        let markdown = self.lines.join("\n").trim().to_string();
        Chapter {
            title: self.title,
            level: self.level,
            html: markdown_to_html(&markdown),
            word_count: count_words(&markdown),
            markdown,
        }
    }
}

/// The two states of the line scanner.
enum State<'a> {
    NoSection,
    Open(OpenSection<'a>),
}

struct Segmentation<'a> {
    state: State<'a>,
    preface: Vec<&'a str>,
    chapters: Vec<Chapter>,
}

impl<'a> Segmentation<'a> {
    fn new() -> Self {
        Self {
            state: State::NoSection,
            preface: Vec::new(),
            chapters: Vec::new(),
        }
    }

    fn step(mut self, line: &'a str) -> Self {
        if let Some(caps) = HEADING_LINE.captures(line) {
            if let State::Open(section) = self.state {
                self.chapters.push(section.close());
            }
            self.state = State::Open(OpenSection {
                level: caps[1].len() as u8,
                title: caps[2].trim().to_string(),
                lines: vec![line],
            });
            return self;
        }

        match &mut self.state {
            State::Open(section) => section.lines.push(line),
            State::NoSection => self.preface.push(line),
        }
        self
    }

    fn finish(mut self) -> (Vec<&'a str>, Vec<Chapter>) {
        if let State::Open(section) = self.state {
            self.chapters.push(section.close());
        }
        (self.preface, self.chapters)
    }
}

fn segment(markdown: &str) -> (Vec<&str>, Vec<Chapter>) {
    markdown
        .lines()
        .fold(Segmentation::new(), Segmentation::step)
        .finish()
}

/// Chapters in document order. Content before the first heading is not part
/// of any chapter.
pub fn extract_chapters(markdown: &str) -> Vec<Chapter> {
    let (_, chapters) = segment(markdown);
    debug!(chapters = chapters.len(), "Markdown segmented");
    chapters
}

/// Preface and chapters in one pass. Without any heading the whole document
/// is the preface.
pub fn extract_structure(markdown: &str, locale: Locale) -> DocumentStructure {
    let (preface_lines, chapters) = segment(markdown);
    let preface = build_preface(&preface_lines.join("\n"), locale);
    debug!(chapters = chapters.len(), has_preface = preface.is_some(), "Structure extracted");
    DocumentStructure { preface, chapters }
}

/// Preface only, with a looser boundary: numbered lines such as `1. Scope`
/// or `2.3. Terms` also end it. Markdown escapes are removed first.
pub fn extract_preface(markdown: &str, locale: Locale) -> Option<Preface> {
    let unescaped = unescape_markdown(markdown);
    let lines: Vec<&str> = unescaped.lines().collect();

    if !lines.iter().any(|line| HEADING_LINE.is_match(line)) {
        return build_preface(&unescaped, locale);
    }

    let boundary = lines
        .iter()
        .position(|line| HEADING_LINE.is_match(line) || NUMERIC_HEADING.is_match(line))
        .unwrap_or(lines.len());
    build_preface(&lines[..boundary].join("\n"), locale)
}

fn build_preface(content: &str, locale: Locale) -> Option<Preface> {
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    let title = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            markdown_to_text(line)
                .trim_matches(|c: char| c.is_whitespace() || "*_-=#~`>".contains(c))
                .to_string()
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| locale.preface_label().to_string());
    Some(Preface {
        title,
        content: content.to_string(),
    })
}

/// `\*` → `*` and friends.
pub fn unescape_markdown(markdown: &str) -> String {
    MARKDOWN_ESCAPE.replace_all(markdown, "$1").into_owned()
}

/// Words of `markdown` with heading markers removed.
pub fn count_words(markdown: &str) -> usize {
    HEADING_MARKER
        .replace_all(markdown, "")
        .split_whitespace()
        .count()
}

/// Split converter HTML into chapter drafts at each heading the transducer
/// keeps: empty headings and headings inside flattened containers are not
/// boundaries. Markup before the first heading and after `</body>` is left
/// out.
pub fn extract_html_chapters(html: &str) -> Vec<ChapterDraft> {
    let flattened = flattened_spans(html);
    let body_end = BODY_END.find(html).map_or(html.len(), |m| m.start());

    let headings: Vec<(usize, u8, String)> = HTML_HEADING
        .captures_iter(html)
        .filter_map(|caps: Captures<'_>| {
            let start = caps.get(0)?.start();
            if start >= body_end || flattened.iter().any(|span| span.contains(&start)) {
                return None;
            }
            let level = caps[1].parse().ok()?;
            Some((start, level, heading_title(&caps[2])?))
        })
        .collect();

    let drafts: Vec<ChapterDraft> = headings
        .iter()
        .enumerate()
        .map(|(i, (start, level, title))| {
            let end = headings.get(i + 1).map_or(body_end, |next| next.0);
            ChapterDraft {
                title: Some(title.clone()),
                level: Some(*level),
                markdown: None,
                html: Some(html[*start..end].trim().to_string()),
            }
        })
        .collect();
    debug!(chapters = drafts.len(), "HTML segmented");
    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "# Title\n\nBody para.\n\n## Sub\n\nMore text.\n";

    #[test]
    fn two_chapters_no_preface() {
        let structure = extract_structure(SCENARIO, Locale::En);
        assert!(structure.preface.is_none());
        let chapters = &structure.chapters;
        assert_eq!(chapters.len(), 2);
        assert_eq!((chapters[0].title.as_str(), chapters[0].level), ("Title", 1));
        assert_eq!((chapters[1].title.as_str(), chapters[1].level), ("Sub", 2));
        assert_eq!(chapters[0].markdown, "# Title\n\nBody para.");
        assert_eq!(chapters[0].word_count, 3);
        assert_eq!(chapters[1].html, "<h2>Sub</h2>\n<p>More text.</p>");
    }

    #[test]
    fn no_heading_means_whole_document_preface() {
        let md = "\nOpening line\n\nSecond paragraph.";
        let structure = extract_structure(md, Locale::En);
        assert!(structure.chapters.is_empty());
        let preface = structure.preface.unwrap();
        assert_eq!(preface.title, "Opening line");
        assert_eq!(preface.content, md.trim());
        assert_eq!(extract_preface(md, Locale::En), Some(preface));
    }

    #[test]
    fn preface_precedes_first_heading() {
        let md = "Foreword text.\n\n# One\nBody";
        let structure = extract_structure(md, Locale::En);
        assert_eq!(structure.preface.unwrap().content, "Foreword text.");
        assert_eq!(structure.chapters.len(), 1);
        assert!(!structure.chapters[0].markdown.contains("Foreword"));
    }

    #[test]
    fn chapters_reconstruct_body() {
        let md = "Intro\n\n# A\ntext a\n\n### B\n- x\n- y\n\n## C\nend";
        let body = md.split_once("# A").map(|(_, rest)| format!("# A{rest}")).unwrap();
        let joined: Vec<String> = extract_chapters(md).into_iter().map(|c| c.markdown).collect();
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&joined.join("\n\n")), normalize(&body));
    }

    #[test]
    fn heading_levels_match_hash_count() {
        let md = "# a\n## b\n### c\n#### d\n##### e\n###### f\n####### not";
        let chapters = extract_chapters(md);
        let levels: Vec<u8> = chapters.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6]);
        assert!(chapters[5].markdown.contains("####### not"));
    }

    #[test]
    fn dedicated_preface_stops_at_numbered_heading_and_unescapes() {
        let md = "\\*Note\\* on \\#tags\nmore\n1. Scope\nscope text\n# Real";
        let preface = extract_preface(md, Locale::En).unwrap();
        assert_eq!(preface.content, "*Note* on #tags\nmore");
        assert_eq!(preface.title, "Note on #tags");

        // General segmentation ignores numbered lines.
        let general = extract_structure(md, Locale::En).preface.unwrap();
        assert!(general.content.contains("1. Scope"));
    }

    #[test]
    fn preface_title_falls_back_to_locale_label() {
        let md = "***\n\n# One";
        assert_eq!(extract_preface(md, Locale::Es).unwrap().title, "Introducción");
        assert_eq!(
            extract_structure(md, Locale::En).preface.unwrap().title,
            "Introduction"
        );
        assert_eq!(extract_preface("# Only heading", Locale::En), None);
    }

    #[test]
    fn words_exclude_heading_markers() {
        assert_eq!(count_words("## Two words\nand three more"), 5);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn html_chapters_split_on_headings() {
        let html = "<p>pre</p><h1>One</h1><p>a</p><h2 id=\"x\">Two <em>b</em></h2><p>c &amp; d</p>";
        let drafts = extract_html_chapters(html);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title.as_deref(), Some("One"));
        assert_eq!(drafts[0].html.as_deref(), Some("<h1>One</h1><p>a</p>"));
        assert_eq!(drafts[1].title.as_deref(), Some("Two b"));
        assert_eq!(drafts[1].level, Some(2));
    }

    #[test]
    fn empty_and_nested_headings_are_not_boundaries() {
        let html = "<html><body><h1></h1><p>alpha</p>\
                    <blockquote><h2>Quoted</h2></blockquote>\
                    <ul><li><h3>Listed</h3></li></ul>\
                    <h1>B</h1><p>beta</p><h3> </h3><p>gamma</p></body></html>";
        let drafts = extract_html_chapters(html);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title.as_deref(), Some("B"));
        assert_eq!(
            drafts[0].html.as_deref(),
            Some("<h1>B</h1><p>beta</p><h3> </h3><p>gamma</p>")
        );
    }
}
