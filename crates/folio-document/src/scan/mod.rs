// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-document path — OCR client, optional in-process engine, and
// post-processing of recognised text.

pub mod client;
pub mod postprocess;

#[cfg(feature = "ocr")]
pub mod ocr;

use std::time::Duration;

use tracing::{info, warn};

pub use client::{OcrClient, TimedRecognition};
pub use postprocess::{OcrOutput, PostProcessOptions};

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrsEngine};

/// Everything one OCR attempt needs besides the bytes.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub languages: Vec<String>,
    pub timeout: Duration,
    pub post: PostProcessOptions,
}

/// Run OCR and post-process the result.
///
/// Never fails: a missing client, an engine error, or a timeout all come back
/// as an empty zero-confidence output carrying the reason as a warning.
pub async fn run_ocr(client: Option<&OcrClient>, bytes: &[u8], request: &OcrRequest) -> OcrOutput {
    let Some(client) = client else {
        warn!("No OCR engine configured");
        return OcrOutput::failed("OCR unavailable: no OCR engine is configured");
    };

    match client
        .recognize(bytes.to_vec(), request.languages.clone(), request.timeout)
        .await
    {
        Ok(timed) => {
            let output = postprocess::post_process(
                &timed.recognition.text,
                timed.recognition.confidence,
                timed.elapsed,
                &request.post,
            );
            info!(
                engine = client.engine_name(),
                confidence = output.confidence,
                "OCR produced output"
            );
            output
        }
        Err(err) => {
            warn!(%err, "OCR failed");
            OcrOutput::failed(format!("OCR failed: {err}"))
        }
    }
}
