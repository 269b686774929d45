// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use folio_core::types::ExtractOptions;

/// Extract chaptered Markdown from manuscripts
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract text, Markdown, HTML, and chapters from a document
    Extract(ExtractArgs),

    /// Segment an existing Markdown file into preface and chapters
    Chapters {
        /// Path to the Markdown file
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct ExtractArgs {
    /// Path to the input document
    pub path: PathBuf,

    /// Declared format (extension or MIME type). Defaults to the file extension.
    #[arg(short, long)]
    pub format: Option<String>,

    /// OCR language code; repeat for several (e.g. --lang eng --lang spa)
    #[arg(short, long = "lang")]
    pub languages: Vec<String>,

    /// Promote short title-like OCR lines to headings
    #[arg(long, default_value_t = false)]
    pub detect_headings: bool,

    /// Normalise OCR list markers
    #[arg(long, default_value_t = false)]
    pub detect_lists: bool,

    /// Keep intra-line spacing instead of collapsing it
    #[arg(long, default_value_t = false)]
    pub preserve_layout: bool,

    /// Bound on one OCR invocation, in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Path to an extraction config file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the OCR detection and recognition models
    #[cfg(feature = "ocr")]
    #[arg(long)]
    pub ocr_models: Option<PathBuf>,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// The full extraction result
    Json,
    /// Only the Markdown body
    Markdown,
}

impl ExtractArgs {
    /// Per-call options. Unset flags leave the config defaults in force.
    pub fn options(&self) -> ExtractOptions {
        let format = self.format.clone().or_else(|| {
            self.path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
        });
        ExtractOptions {
            format,
            languages: Some(self.languages.clone()).filter(|langs| !langs.is_empty()),
            preserve_layout: self.preserve_layout,
            detect_headings: self.detect_headings.then_some(true),
            detect_lists: self.detect_lists.then_some(true),
            timeout_ms: self.timeout_ms,
        }
    }
}
