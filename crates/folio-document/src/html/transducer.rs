// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML → Markdown transduction.
//
// Converter-produced HTML is rewritten by a fixed sequence of tag-boundary
// passes rather than a tree parse. The order is load-bearing: container blocks
// (blockquote, pre) go before headings, headings before lists and paragraphs,
// and inline markup after that. A pass that stripped inner tags early would
// corrupt the matches of every later pass.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::entities::decode_entities;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(NON_CONTENT, r"(?is)<!--.*?-->|<head\b[^>]*>.*?</head>|<style\b[^>]*>.*?</style>|<script\b[^>]*>.*?</script>");
pattern!(BLOCKQUOTE, r"(?is)<blockquote\b[^>]*>(.*?)</blockquote>");
pattern!(PRE, r"(?is)<pre\b[^>]*>(.*?)</pre>");
pattern!(UNORDERED_LIST, r"(?is)<ul\b[^>]*>(.*?)</ul>");
pattern!(ORDERED_LIST, r"(?is)<ol\b([^>]*)>(.*?)</ol>");
pattern!(LIST_ITEM, r"(?is)<li\b[^>]*>(.*?)</li>");
pattern!(LIST_START, r#"(?i)\bstart\s*=\s*["']?(\d+)"#);
pattern!(STRONG, r"(?is)<strong\b[^>]*>(.*?)</strong>");
pattern!(BOLD, r"(?is)<b\b[^>]*>(.*?)</b>");
pattern!(EMPHASIS, r"(?is)<em\b[^>]*>(.*?)</em>");
pattern!(ITALIC, r"(?is)<i\b[^>]*>(.*?)</i>");
pattern!(UNDERLINE, r"(?is)<u\b[^>]*>(.*?)</u>");
pattern!(INLINE_CODE, r"(?is)<code\b[^>]*>(.*?)</code>");
pattern!(PARAGRAPH, r"(?is)<p\b[^>]*>(.*?)</p>");
pattern!(PARAGRAPH_CLOSE, r"(?i)</p\s*>");
pattern!(LINE_BREAK, r"(?i)<br\s*/?>");
pattern!(ANY_TAG, r"<[^>]*>");
pattern!(BLANK_LINE, r"(?m)^[ \t]+$");
pattern!(EXCESS_NEWLINES, r"\n{3,}");
pattern!(INNER_WHITESPACE, r"\s+");

static HEADINGS: LazyLock<Vec<(usize, Regex)>> = LazyLock::new(|| {
    (1..=6)
        .map(|level| {
            let re = Regex::new(&format!(r"(?is)<h{level}\b[^>]*>(.*?)</h{level}>"))
                .expect("valid regex");
            (level, re)
        })
        .collect()
});

/// Rewrite converter HTML into Markdown.
///
/// The output carries no HTML tags and its headings are ATX lines, ready for
/// heading-based segmentation. Malformed or overlapping markup is handled on a
/// best-effort basis.
pub fn html_to_markdown(html: &str) -> String {
    let mut md = html.replace("\r\n", "\n");
    md = NON_CONTENT.replace_all(&md, "").into_owned();

    md = rewrite_blockquotes(&md);
    md = rewrite_preformatted(&md);
    md = rewrite_headings(&md);
    md = rewrite_lists(&md);
    md = rewrite_inline(&md);

    md = PARAGRAPH
        .replace_all(&md, |caps: &Captures<'_>| format!("{}\n\n", caps[1].trim()))
        .into_owned();
    md = LINE_BREAK.replace_all(&md, "\n").into_owned();
    md = strip_tags(&md);
    md = decode_entities(&md);

    normalize_whitespace(&md)
}

/// Byte ranges whose headings never reach the Markdown: comments, scripts,
/// and the containers that are flattened to text (blockquotes, preformatted
/// blocks, lists).
pub(crate) fn flattened_spans(html: &str) -> Vec<Range<usize>> {
    [&*NON_CONTENT, &*BLOCKQUOTE, &*PRE, &*UNORDERED_LIST, &*ORDERED_LIST]
        .into_iter()
        .flat_map(|re| re.find_iter(html).map(|m| m.range()))
        .collect()
}

/// The title a heading's inner HTML becomes in Markdown, or `None` when the
/// heading is dropped for having no text.
pub(crate) fn heading_title(inner: &str) -> Option<String> {
    let title = collapse_inline(&strip_tags(inner));
    if title.is_empty() {
        return None;
    }
    Some(decode_entities(&title).trim().to_string())
}

/// Remove every tag, keeping the text between them.
pub fn strip_tags(html: &str) -> String {
    ANY_TAG.replace_all(html, "").into_owned()
}

/// Plain text of an HTML fragment: breaks become newlines, tags go, entities
/// are decoded, and whitespace is normalized.
pub fn html_to_text(html: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(html, "\n");
    let with_paragraphs = PARAGRAPH_CLOSE.replace_all(&with_breaks, "\n\n");
    normalize_whitespace(&decode_entities(&strip_tags(&with_paragraphs)))
}

fn rewrite_blockquotes(html: &str) -> String {
    BLOCKQUOTE
        .replace_all(html, |caps: &Captures<'_>| {
            let inner = LINE_BREAK.replace_all(&caps[1], "\n");
            let inner = PARAGRAPH_CLOSE.replace_all(&inner, "\n");
            let text = strip_tags(&inner);
            let quoted: Vec<String> = text
                .trim()
                .lines()
                .map(|line| {
                    let line = line.trim();
                    if line.is_empty() { ">".to_string() } else { format!("> {line}") }
                })
                .collect();
            format!("\n\n{}\n\n", quoted.join("\n"))
        })
        .into_owned()
}

fn rewrite_preformatted(html: &str) -> String {
    PRE.replace_all(html, |caps: &Captures<'_>| {
        let code = strip_tags(&caps[1]);
        format!("\n\n```\n{}\n```\n\n", code.trim_matches('\n'))
    })
    .into_owned()
}

fn rewrite_headings(html: &str) -> String {
    let mut out = html.to_string();
    for (level, re) in HEADINGS.iter() {
        out = re
            .replace_all(&out, |caps: &Captures<'_>| {
                let title = collapse_inline(&strip_tags(&caps[1]));
                if title.is_empty() {
                    "\n\n".to_string()
                } else {
                    format!("\n\n{} {title}\n\n", "#".repeat(*level))
                }
            })
            .into_owned();
    }
    out
}

fn rewrite_lists(html: &str) -> String {
    let unordered = UNORDERED_LIST.replace_all(html, |caps: &Captures<'_>| {
        let items: Vec<String> = list_items(&caps[1])
            .into_iter()
            .map(|item| format!("- {item}"))
            .collect();
        format!("\n\n{}\n\n", items.join("\n"))
    });

    ORDERED_LIST
        .replace_all(&unordered, |caps: &Captures<'_>| {
            let start = LIST_START
                .captures(&caps[1])
                .and_then(|m| m[1].parse::<usize>().ok())
                .unwrap_or(1);
            let items: Vec<String> = list_items(&caps[2])
                .into_iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {item}", start + i))
                .collect();
            format!("\n\n{}\n\n", items.join("\n"))
        })
        .into_owned()
}

fn list_items(list_body: &str) -> Vec<String> {
    LIST_ITEM
        .captures_iter(list_body)
        .map(|caps| collapse_inline(&strip_tags(&caps[1])))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Inline markup, each tag matched at top level once. Nested repeats of the
/// same tag are not re-processed; leftovers are stripped later.
fn rewrite_inline(html: &str) -> String {
    let passes: [(&Regex, &str); 6] = [
        (&*STRONG, "**"),
        (&*BOLD, "**"),
        (&*EMPHASIS, "*"),
        (&*ITALIC, "*"),
        (&*UNDERLINE, "_"),
        (&*INLINE_CODE, "`"),
    ];

    let mut out = html.to_string();
    for (re, marker) in passes {
        out = re
            .replace_all(&out, |caps: &Captures<'_>| {
                let inner = if marker == "`" { strip_tags(&caps[1]) } else { caps[1].to_string() };
                wrap_inline(&inner, marker)
            })
            .into_owned();
    }
    out
}

/// Wrap `inner` in `marker`, keeping surrounding whitespace outside the
/// markers so `**word **` never appears.
fn wrap_inline(inner: &str, marker: &str) -> String {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return inner.to_string();
    }
    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];
    format!("{leading}{marker}{trimmed}{marker}{trailing}")
}

fn collapse_inline(text: &str) -> String {
    INNER_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Collapse 3+ newlines to a blank line and trim the ends.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    let cleared = BLANK_LINE.replace_all(text, "");
    EXCESS_NEWLINES.replace_all(&cleared, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_paragraph_and_bold() {
        let md = html_to_markdown("<h1>A</h1><p>x</p><strong>y</strong>");
        assert_eq!(md, "# A\n\nx\n\n**y**");
        assert!(!md.contains('<') && !md.contains('>'));
    }

    #[test]
    fn heading_levels_and_inner_tags() {
        let md = html_to_markdown("<h3 class=\"t\">Part <em>One</em></h3><h6>Deep</h6>");
        assert_eq!(md, "### Part One\n\n###### Deep");
    }

    #[test]
    fn blockquote_lines_are_prefixed() {
        let md = html_to_markdown("<blockquote><p>first</p><p>second</p></blockquote>");
        assert_eq!(md, "> first\n> second");
    }

    #[test]
    fn preformatted_becomes_fenced_block() {
        let md = html_to_markdown("<pre><code>let x = 1;\nlet y = &lt;2&gt;;</code></pre>");
        assert_eq!(md, "```\nlet x = 1;\nlet y = <2>;\n```");
    }

    #[test]
    fn lists_are_rewritten() {
        let md = html_to_markdown(
            "<ul><li>one</li><li><strong>two</strong></li></ul><ol start=\"3\"><li>c</li><li>d</li></ol>",
        );
        assert_eq!(md, "- one\n- two\n\n3. c\n4. d");
    }

    #[test]
    fn inline_markers_keep_whitespace_outside() {
        let md = html_to_markdown("<p>a<em> b </em>c <u>u</u> <code>x&lt;y</code></p>");
        assert_eq!(md, "a *b* c _u_ `x<y`");
    }

    #[test]
    fn nested_emphasis_of_different_tags() {
        assert_eq!(html_to_markdown("<strong><em>both</em></strong>"), "***both***");
    }

    #[test]
    fn breaks_entities_and_leftover_tags() {
        let md = html_to_markdown("<div>Line&nbsp;one<br/>Line &amp; two<span>!</span></div>");
        assert_eq!(md, "Line one\nLine & two!");
    }

    #[test]
    fn escaped_markup_stays_text() {
        let md = html_to_markdown("<p>&amp;#60;b&amp;#62; and &amp;lt;i&amp;gt;</p>");
        assert_eq!(md, "&#60;b&#62; and &lt;i&gt;");
    }

    #[test]
    fn head_style_and_comments_are_dropped() {
        let md = html_to_markdown(
            "<html><head><title>T</title><style>p{}</style></head><body><!-- x --><p>Body</p></body></html>",
        );
        assert_eq!(md, "Body");
    }

    #[test]
    fn excess_blank_lines_collapse() {
        let md = html_to_markdown("<p>a</p>\n\n\n \n<p>b</p>");
        assert_eq!(md, "a\n\nb");
    }

    #[test]
    fn output_is_a_fixed_point() {
        let html = "<h1>Title</h1><p>Some <b>bold</b> and <i>italic</i>.</p>\
                    <ul><li>x</li></ul><blockquote>quoted</blockquote><pre>code</pre>";
        let once = html_to_markdown(html);
        let twice = html_to_markdown(&strip_tags(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn html_to_text_drops_markup() {
        assert_eq!(html_to_text("<p>a <b>b</b></p><p>c<br>d</p>"), "a b\n\nc\nd");
    }
}
