// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR client — the owned capability the pipeline threads through extraction
// calls. Bounds concurrent sessions with a semaphore, runs the synchronous
// engine on the blocking pool, and applies the per-call timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use folio_bridge::{OcrEngine, OcrSession, Recognition};
use folio_core::error::{FolioError, Result};

/// Terminates the session on every exit path, including panics.
struct SessionGuard(Box<dyn OcrSession>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.terminate();
    }
}

/// Recognition plus the wall time the engine took.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedRecognition {
    pub recognition: Recognition,
    pub elapsed: Duration,
}

/// Shared handle to an OCR engine.
#[derive(Clone)]
pub struct OcrClient {
    engine: Arc<dyn OcrEngine>,
    permits: Arc<Semaphore>,
}

impl OcrClient {
    /// `max_sessions` is clamped to at least one.
    pub fn new(engine: Arc<dyn OcrEngine>, max_sessions: usize) -> Self {
        Self {
            engine,
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run one session over `image`.
    ///
    /// The permit and the session are owned by the blocking task, so both are
    /// released when it finishes even if the caller has already timed out.
    #[instrument(skip_all, fields(engine = self.engine.name(), bytes_len = image.len()))]
    pub async fn recognize(
        &self,
        image: Vec<u8>,
        languages: Vec<String>,
        timeout: Duration,
    ) -> Result<TimedRecognition> {
        let started = Instant::now();
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|err| FolioError::Ocr(format!("OCR session pool closed: {err}")))?;

        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let session = engine.create_session(&languages)?;
            let mut guard = SessionGuard(session);
            guard.0.recognize(&image)
        });

        let remaining = timeout.saturating_sub(started.elapsed());
        let recognition = match tokio::time::timeout(remaining, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(FolioError::Ocr(format!("OCR task aborted: {join_err}")));
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "OCR timed out");
                return Err(FolioError::Ocr(format!(
                    "OCR timed out after {} ms",
                    timeout.as_millis()
                )));
            }
        };

        let elapsed = started.elapsed();
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            chars = recognition.text.len(),
            "OCR session finished"
        );
        Ok(TimedRecognition { recognition, elapsed })
    }
}

impl std::fmt::Debug for OcrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrClient")
            .field("engine", &self.engine.name())
            .field("available_sessions", &self.permits.available_permits())
            .finish()
    }
}
