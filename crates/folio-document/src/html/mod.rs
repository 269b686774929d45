// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML module — entity decoding and HTML → Markdown transduction.

pub mod entities;
pub mod transducer;

pub use entities::decode_entities;
pub use transducer::{html_to_markdown, html_to_text, strip_tags};
