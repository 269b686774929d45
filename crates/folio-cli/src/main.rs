// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio — command-line entry point.
//
// Logging goes to stderr (RUST_LOG, default "info") so stdout carries only
// the JSON or Markdown output.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use folio_core::config::ExtractionConfig;
use folio_core::error::Result;
use folio_core::human_errors::humanize_error;
use folio_document::{extract_structure, Extractor};

use crate::cli::{Cli, Command, ExtractArgs, OutputFormat};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            for warning in err.warnings() {
                eprintln!("  - {warning}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<String> {
    match command {
        Command::Extract(args) => extract(&args).await,
        Command::Chapters { path } => {
            let markdown = tokio::fs::read_to_string(&path).await?;
            let structure = extract_structure(&markdown, ExtractionConfig::default().locale);
            Ok(serde_json::to_string_pretty(&structure)?)
        }
    }
}

async fn extract(args: &ExtractArgs) -> Result<String> {
    let config = match &args.config {
        Some(path) => ExtractionConfig::load_from_file(path)?,
        None => ExtractionConfig::default(),
    };
    let extractor = build_extractor(args, config)?;

    let bytes = tokio::fs::read(&args.path).await?;
    info!(path = %args.path.display(), bytes = bytes.len(), "Extracting");
    let result = extractor.extract(&bytes, &args.options()).await?;

    match args.output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result)?),
        OutputFormat::Markdown => Ok(result.markdown),
    }
}

#[cfg(not(feature = "ocr"))]
fn build_extractor(_args: &ExtractArgs, config: ExtractionConfig) -> Result<Extractor> {
    Extractor::builder().config(config).build()
}

/// An explicit model directory must load; the default location is optional.
#[cfg(feature = "ocr")]
fn build_extractor(args: &ExtractArgs, config: ExtractionConfig) -> Result<Extractor> {
    use std::sync::Arc;

    use folio_document::{OcrConfig, OcrsEngine};

    let builder = Extractor::builder().config(config);
    let engine = match &args.ocr_models {
        Some(dir) => Some(OcrsEngine::new(OcrConfig::from_dir(dir))?),
        None => match OcrsEngine::with_defaults() {
            Ok(engine) => Some(engine),
            Err(err) => {
                tracing::warn!(%err, "OCR models not found; scanned documents will not be read");
                None
            }
        },
    };
    match engine {
        Some(engine) => builder.ocr_engine(Arc::new(engine)).build(),
        None => builder.build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::error::FolioError;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn chapters_prints_structure_json() {
        let file = write_temp(".md", b"Opening.\n\n# One\nbody\n\n# Two\nmore");
        let output = run(Command::Chapters {
            path: file.path().to_path_buf(),
        })
        .await
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["chapters"].as_array().unwrap().len(), 2);
        assert_eq!(value["chapters"][1]["title"], "Two");
        assert_eq!(value["preface"]["content"], "Opening.");
    }

    #[tokio::test]
    async fn extract_markdown_output() {
        let file = write_temp(".txt", b"# Title\nSome text");
        let cli = Cli::parse_from([
            "folio",
            "extract",
            file.path().to_str().unwrap(),
            "--output",
            "markdown",
        ]);
        let output = run(cli.command).await.unwrap();
        assert_eq!(output, "# Title\nSome text");
    }

    #[tokio::test]
    async fn unsupported_file_is_an_error() {
        let file = write_temp(".doc", b"legacy");
        let cli = Cli::parse_from(["folio", "extract", file.path().to_str().unwrap()]);
        let err = run(cli.command).await.unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let cli = Cli::parse_from(["folio", "extract", "/nonexistent/folio/input.pdf"]);
        let err = run(cli.command).await.unwrap_err();
        assert!(matches!(err, FolioError::Io(_)));
    }
}
