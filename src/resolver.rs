//! Multi-engine text recognition with ordered fallback.

use crate::engine::{RecognitionEngine, RecognitionResult};
use crate::error::DocumentError;
use crate::outcome::Outcome;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// Timed-out calls an engine may leave running before it is skipped
pub const MAX_ABANDONED_CALLS: usize = 4;

#[derive(Clone)]
struct EngineSlot {
    engine: Arc<dyn RecognitionEngine>,
    /// Calls that timed out and whose thread has not finished yet
    abandoned: Arc<AtomicUsize>,
}

/// Runs engines in order until one returns non-empty text.
///
/// An engine is skipped when it errors, panics, returns only whitespace, or
/// exceeds the per-call timeout. An engine with [`MAX_ABANDONED_CALLS`] timed-out
/// calls still running is skipped without being called. When every engine has
/// been tried the result is an empty, unsuccessful [`RecognitionResult`]
/// reported as degraded; recognition itself never fails the caller.
#[derive(Clone)]
pub struct RecognitionResolver {
    engines: Vec<EngineSlot>,
    timeout: Option<Duration>,
    max_abandoned: usize,
}

impl RecognitionResolver {
    pub fn new(engines: Vec<Arc<dyn RecognitionEngine>>, timeout: Option<Duration>) -> Self {
        let engines = engines
            .into_iter()
            .map(|engine| EngineSlot {
                engine,
                abandoned: Arc::new(AtomicUsize::new(0)),
            })
            .collect();
        Self {
            engines,
            timeout,
            max_abandoned: MAX_ABANDONED_CALLS,
        }
    }

    /// Override how many timed-out calls an engine may leave running
    pub fn with_max_abandoned(mut self, max_abandoned: usize) -> Self {
        self.max_abandoned = max_abandoned;
        self
    }

    pub fn recognize(&self, image: &Path) -> Outcome<RecognitionResult> {
        let mut failures = Vec::new();

        for slot in &self.engines {
            let engine = &slot.engine;
            let start = Instant::now();
            match self.call_engine(slot, image) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        engine = engine.name(),
                        chars = text.len(),
                        time_ms = start.elapsed().as_millis() as u64,
                        "Recognized text"
                    );
                    return Outcome::Success(RecognitionResult::new(text, engine.name()));
                }
                Ok(_) => {
                    tracing::info!(engine = engine.name(), "Engine returned no text, trying next");
                    failures.push(format!("{}: empty result", engine.name()));
                }
                Err(e) => {
                    tracing::warn!(engine = engine.name(), "Engine failed, trying next: {}", e);
                    failures.push(format!("{}: {}", engine.name(), e));
                }
            }
        }

        let last_engine = self.engines.last().map(|s| s.engine.name()).unwrap_or("none");
        let reason = if failures.is_empty() {
            "no recognition engines configured".to_string()
        } else {
            format!("all engines failed ({})", failures.join("; "))
        };
        tracing::warn!(image = %image.display(), "{}", reason);

        Outcome::degraded(RecognitionResult::empty(last_engine), reason)
    }

    fn call_engine(&self, slot: &EngineSlot, image: &Path) -> Result<String, DocumentError> {
        let engine = &slot.engine;
        let Some(timeout) = self.timeout else {
            return guarded_recognize(engine.as_ref(), image);
        };

        let outstanding = slot.abandoned.load(Ordering::SeqCst);
        if outstanding >= self.max_abandoned {
            return Err(DocumentError::ProcessingError(format!(
                "Engine '{}' still has {} timed-out calls running",
                engine.name(),
                outstanding
            )));
        }

        // The engine runs on its own thread so a hung call cannot block the
        // pipeline. A call that times out is abandoned and its result dropped.
        // Exactly one of the caller and the worker sees `settled` unset; when
        // the caller gave up first the worker releases the abandoned count.
        let settled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let worker_engine = Arc::clone(engine);
        let worker_image = image.to_path_buf();
        let worker_settled = Arc::clone(&settled);
        let worker_abandoned = Arc::clone(&slot.abandoned);
        thread::Builder::new()
            .name(format!("recognize-{}", engine.name()))
            .spawn(move || {
                let result = guarded_recognize(worker_engine.as_ref(), &worker_image);
                if worker_settled.swap(true, Ordering::SeqCst) {
                    worker_abandoned.fetch_sub(1, Ordering::SeqCst);
                }
                let _ = tx.send(result);
            })
            .map_err(|e| {
                DocumentError::Internal(format!("Failed to spawn engine thread: {}", e))
            })?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let outstanding = slot.abandoned.fetch_add(1, Ordering::SeqCst) + 1;
                if settled.swap(true, Ordering::SeqCst) {
                    // finished between the timeout and now
                    slot.abandoned.fetch_sub(1, Ordering::SeqCst);
                } else {
                    tracing::warn!(
                        engine = engine.name(),
                        outstanding,
                        "Abandoned timed-out engine call"
                    );
                }
                Err(DocumentError::EngineTimeout {
                    engine: engine.name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(panicked(engine.as_ref())),
        }
    }
}

/// Run one engine call, turning a panic into an error
fn guarded_recognize(
    engine: &dyn RecognitionEngine,
    image: &Path,
) -> Result<String, DocumentError> {
    panic::catch_unwind(AssertUnwindSafe(|| engine.recognize(image)))
        .unwrap_or_else(|_| Err(panicked(engine)))
}

fn panicked(engine: &dyn RecognitionEngine) -> DocumentError {
    DocumentError::ProcessingError(format!("Engine '{}' panicked", engine.name()))
}
