// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markdown line classification, Markdown → HTML rendering, and Markdown →
// plain text. Covers the subset the pipeline itself produces: ATX headings,
// bullet and numbered lists, fenced code, blockquotes, paragraphs, and
// `**` / `*` / `_` / backtick inline markers.

use std::sync::LazyLock;

use regex::Regex;

pub(crate) static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

static BULLET_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.+)$").expect("valid regex"));

static NUMBERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s+(.+)$").expect("valid regex"));

static QUOTE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s?(.*)$").expect("valid regex"));

static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));

static STRONG_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+?)\*\*").expect("valid regex"));

static EMPHASIS_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*?)\*").expect("valid regex"));

static UNDERLINE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\W)_([^_\n]+)_(\W|$)").expect("valid regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// What a single Markdown line is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Heading { level: u8, text: &'a str },
    Bullet(&'a str),
    Numbered { number: usize, text: &'a str },
    Quote(&'a str),
    Fence,
    Text(&'a str),
}

/// Classify one line. Headings are checked before lists so `# 1. Intro`
/// stays a heading.
pub fn classify_line(line: &str) -> LineKind<'_> {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if line.trim_start().starts_with("```") {
        return LineKind::Fence;
    }
    if let Some(caps) = HEADING_LINE.captures(line) {
        let hashes = caps.get(1).map_or(1, |m| m.len());
        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        return LineKind::Heading { level: hashes as u8, text };
    }
    if let Some(caps) = QUOTE_LINE.captures(line) {
        return LineKind::Quote(caps.get(1).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = NUMBERED_ITEM.captures(line) {
        let number = caps[1].parse().unwrap_or(1);
        return LineKind::Numbered {
            number,
            text: caps.get(2).map_or("", |m| m.as_str()).trim(),
        };
    }
    if let Some(caps) = BULLET_ITEM.captures(line) {
        return LineKind::Bullet(caps.get(1).map_or("", |m| m.as_str()).trim());
    }
    LineKind::Text(line.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    Paragraph,
    Unordered,
    Ordered,
    Quote,
}

struct HtmlWriter {
    blocks: Vec<String>,
    open: OpenBlock,
    buffer: Vec<String>,
    ordered_start: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            open: OpenBlock::None,
            buffer: Vec::new(),
            ordered_start: 1,
        }
    }

    fn switch_to(&mut self, block: OpenBlock) {
        if self.open != block {
            self.close();
            self.open = block;
        }
    }

    fn close(&mut self) {
        let lines = std::mem::take(&mut self.buffer);
        match self.open {
            OpenBlock::None => {}
            OpenBlock::Paragraph => self.blocks.push(format!("<p>{}</p>", lines.join(" "))),
            OpenBlock::Quote => self
                .blocks
                .push(format!("<blockquote><p>{}</p></blockquote>", lines.join("<br/>"))),
            OpenBlock::Unordered => self.blocks.push(format!("<ul>{}</ul>", list_items(&lines))),
            OpenBlock::Ordered => {
                let start = if self.ordered_start == 1 {
                    String::new()
                } else {
                    format!(" start=\"{}\"", self.ordered_start)
                };
                self.blocks.push(format!("<ol{start}>{}</ol>", list_items(&lines)));
            }
        }
        self.open = OpenBlock::None;
    }

    fn finish(mut self) -> String {
        self.close();
        self.blocks.join("\n")
    }
}

fn list_items(items: &[String]) -> String {
    items.iter().map(|item| format!("<li>{item}</li>")).collect()
}

/// Render Markdown to an HTML fragment. Text is escaped before inline markers
/// are applied.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut writer = HtmlWriter::new();
    let mut code: Option<Vec<&str>> = None;

    for line in markdown.lines() {
        if let Some(code_lines) = code.as_mut() {
            if matches!(classify_line(line), LineKind::Fence) {
                let body = escape_html(&code_lines.join("\n"));
                writer.blocks.push(format!("<pre><code>{body}</code></pre>"));
                code = None;
            } else {
                code_lines.push(line);
            }
            continue;
        }

        match classify_line(line) {
            LineKind::Blank => writer.close(),
            LineKind::Fence => {
                writer.close();
                code = Some(Vec::new());
            }
            LineKind::Heading { level, text } => {
                writer.close();
                writer
                    .blocks
                    .push(format!("<h{level}>{}</h{level}>", render_inline(text)));
            }
            LineKind::Bullet(text) => {
                writer.switch_to(OpenBlock::Unordered);
                writer.buffer.push(render_inline(text));
            }
            LineKind::Numbered { number, text } => {
                if writer.open != OpenBlock::Ordered {
                    writer.switch_to(OpenBlock::Ordered);
                    writer.ordered_start = number;
                }
                writer.buffer.push(render_inline(text));
            }
            LineKind::Quote(text) => {
                writer.switch_to(OpenBlock::Quote);
                writer.buffer.push(render_inline(text));
            }
            LineKind::Text(text) => {
                writer.switch_to(OpenBlock::Paragraph);
                writer.buffer.push(render_inline(text));
            }
        }
    }

    // An unterminated fence still renders its body.
    if let Some(code_lines) = code {
        writer.close();
        let body = escape_html(&code_lines.join("\n"));
        writer.blocks.push(format!("<pre><code>{body}</code></pre>"));
    }

    writer.finish()
}

/// Escape and apply inline markers to a single line.
pub fn render_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let with_code = CODE_SPAN.replace_all(&escaped, "<code>$1</code>");
    let with_strong = STRONG_SPAN.replace_all(&with_code, "<strong>$1</strong>");
    let with_em = EMPHASIS_SPAN.replace_all(&with_strong, "<em>$1</em>");
    UNDERLINE_SPAN
        .replace_all(&with_em, "$1<u>$2</u>$3")
        .into_owned()
}

/// Plain text of a Markdown document: block and inline markers removed.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut lines = Vec::new();
    for line in markdown.lines() {
        let text = match classify_line(line) {
            LineKind::Blank => String::new(),
            LineKind::Fence => continue,
            LineKind::Heading { text, .. }
            | LineKind::Bullet(text)
            | LineKind::Numbered { text, .. }
            | LineKind::Quote(text)
            | LineKind::Text(text) => strip_inline(text),
        };
        lines.push(text);
    }
    EXCESS_NEWLINES
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn strip_inline(text: &str) -> String {
    let without_code = CODE_SPAN.replace_all(text, "$1");
    let without_strong = STRONG_SPAN.replace_all(&without_code, "$1");
    let without_em = EMPHASIS_SPAN.replace_all(&without_strong, "$1");
    UNDERLINE_SPAN
        .replace_all(&without_em, "$1$2$3")
        .into_owned()
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
