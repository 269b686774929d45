// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — content-stream scanning, lopdf-backed reading, and the tiered
// extraction chain that ties them to OCR.

pub mod reader;
pub mod scanner;
pub mod tiered;

pub use reader::{EmbeddedImage, LopdfMarkdownConverter, PdfReader};
pub use scanner::{PdfKind, PdfSignals};
pub use tiered::{PdfExtraction, PdfTier, TieredPdfExtractor};
