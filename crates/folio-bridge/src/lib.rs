// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — collaborator bridge abstractions.
//
// The extraction pipeline talks to three external collaborators: a
// word-processor-to-HTML converter, a structured PDF-to-Markdown converter,
// and an OCR engine. This crate defines their traits and the stubs used when
// a collaborator is not installed; concrete implementations live in
// `folio-document` or in the embedding application.

pub mod stub;
pub mod traits;

pub use stub::{UnavailableHtmlConverter, UnavailableOcrEngine, UnavailablePdfConverter};
pub use traits::{ConvertedHtml, HtmlConverter, OcrEngine, OcrSession, PdfMarkdownConverter, Recognition};
