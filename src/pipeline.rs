//! Document resolution: turn an uploaded document into raw text.
//!
//! Paginated documents try their embedded text layer first and fall back to
//! rasterizing every page and running recognition on each render. Standalone
//! images are enhanced and then recognized. Whatever goes wrong inside is
//! caught here and reported as empty text, except for a paginated document
//! without pages, which no amount of fallback can read.

use crate::artifact::ImageArtifact;
use crate::config::Config;
use crate::document::text_layer::read_digital_text;
use crate::document::{
    DocumentFormat, Page, PdfRasterizer, PdfTextLayer, Rasterizer, SourceDocument, TextLayer,
};
use crate::engine::RecognitionResult;
use crate::error::DocumentError;
use crate::outcome::Outcome;
use crate::preprocessing::ImageEnhancer;
use crate::resolver::RecognitionResolver;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const NO_PAGES_MESSAGE: &str = "No pages found in PDF file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Digital text must be longer than this (trimmed) to skip OCR
    pub min_digital_text_chars: usize,
    pub page_workers: usize,
    pub document_deadline: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            min_digital_text_chars: 20,
            page_workers: 1,
            document_deadline: None,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_digital_text_chars: config.min_digital_text_chars,
            page_workers: config.page_workers.max(1),
            document_deadline: config.document_deadline,
        }
    }
}

struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> Result<(), DocumentError> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => {
                Err(DocumentError::DeadlineExceeded {
                    deadline_ms: limit.as_millis() as u64,
                })
            }
            _ => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DocumentPipeline {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    enhancer: ImageEnhancer,
    resolver: RecognitionResolver,
    settings: PipelineSettings,
}

impl DocumentPipeline {
    pub fn new(
        resolver: RecognitionResolver,
        artifact_dir: impl Into<PathBuf>,
        settings: PipelineSettings,
    ) -> Self {
        let artifact_dir = artifact_dir.into();
        Self {
            text_layer: Box::new(PdfTextLayer),
            rasterizer: Box::new(PdfRasterizer::new(artifact_dir.clone())),
            enhancer: ImageEnhancer::new(artifact_dir),
            resolver,
            settings,
        }
    }

    pub fn from_config(resolver: RecognitionResolver, config: &Config) -> Self {
        Self::new(resolver, config.artifact_dir.clone(), PipelineSettings::from(config))
    }

    pub fn with_text_layer(mut self, text_layer: impl TextLayer + 'static) -> Self {
        self.text_layer = Box::new(text_layer);
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    /// Resolve the text of `document`.
    ///
    /// Returns `Fatal` only for a paginated document without pages. Every other
    /// failure, panics included, is logged and reported as degraded empty text.
    pub fn resolve(&self, document: &SourceDocument) -> Outcome<String> {
        let start = Instant::now();
        let deadline = Deadline::start(self.settings.document_deadline);

        tracing::info!(
            document_id = %document.id(),
            format = document.format().as_str(),
            "Resolving document text"
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| match document.format() {
            DocumentFormat::Paginated => self.resolve_paginated(document, &deadline),
            DocumentFormat::Image => self.resolve_image(document, &deadline),
        }));

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(DocumentError::UnreadableDocument(reason))) => {
                tracing::warn!(document_id = %document.id(), "Unreadable document: {}", reason);
                Outcome::Fatal(reason)
            }
            Ok(Err(e)) => {
                tracing::error!(document_id = %document.id(), "Document resolution failed: {}", e);
                Outcome::degraded(String::new(), e.to_string())
            }
            Err(_) => {
                tracing::error!(document_id = %document.id(), "Document resolution panicked");
                Outcome::degraded(String::new(), "document resolution panicked")
            }
        };

        tracing::info!(
            document_id = %document.id(),
            chars = outcome.value().map(|text| text.len()).unwrap_or_default(),
            degraded = outcome.is_degraded(),
            time_ms = start.elapsed().as_millis() as u64,
            "Document text resolved"
        );

        outcome
    }

    fn resolve_paginated(
        &self,
        document: &SourceDocument,
        deadline: &Deadline,
    ) -> Result<Outcome<String>, DocumentError> {
        let digital = read_digital_text(
            self.text_layer.as_ref(),
            document.path(),
            self.settings.min_digital_text_chars,
        );
        if let Outcome::Success(text) = digital {
            return Ok(Outcome::Success(text));
        }

        let pages = self.rasterizer.rasterize(document)?;
        if pages.is_empty() {
            return Err(DocumentError::UnreadableDocument(NO_PAGES_MESSAGE.to_string()));
        }
        tracing::info!(
            document_id = %document.id(),
            pages = pages.len(),
            "Rasterized document for recognition"
        );

        let pages = self.recognize_pages(pages, deadline)?;

        let failed: Vec<String> = pages
            .iter()
            .filter(|page| !page.recognition.as_ref().is_some_and(|r| r.success))
            .map(|page| page.index.to_string())
            .collect();
        let text = pages.iter().map(Page::text).collect::<Vec<_>>().join("\n");

        if failed.is_empty() {
            Ok(Outcome::Success(text))
        } else {
            Ok(Outcome::degraded(
                text,
                format!("no text recognized on page(s) {}", failed.join(", ")),
            ))
        }
    }

    /// Recognize every page and return them in ascending index order
    fn recognize_pages(
        &self,
        pages: Vec<Page>,
        deadline: &Deadline,
    ) -> Result<Vec<Page>, DocumentError> {
        let total = pages.len();
        let workers = self.settings.page_workers.clamp(1, total.max(1));

        if workers == 1 {
            let mut done = Vec::with_capacity(total);
            for mut page in pages {
                deadline.check()?;
                self.recognize_page(&mut page);
                done.push(page);
            }
            return Ok(done);
        }

        let queue = Mutex::new(pages.into_iter().collect::<VecDeque<_>>());
        let done = Mutex::new(Vec::with_capacity(total));
        let failure: Mutex<Option<DocumentError>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = lock(&queue).pop_front();
                    let Some(mut page) = next else {
                        break;
                    };
                    if let Err(e) = deadline.check() {
                        let mut slot = lock(&failure);
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        drop(slot);
                        // remaining renders are released with the queue
                        lock(&queue).clear();
                        break;
                    }
                    self.recognize_page(&mut page);
                    lock(&done).push(page);
                });
            }
        });

        if let Some(e) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(e);
        }

        let mut done = done.into_inner().unwrap_or_else(PoisonError::into_inner);
        done.sort_by_key(|page| page.index);
        Ok(done)
    }

    fn recognize_page(&self, page: &mut Page) {
        let outcome = match page.render_path() {
            Some(path) => self.resolver.recognize(path),
            None => Outcome::degraded(RecognitionResult::empty("none"), "page has no render"),
        };
        if let Some(reason) = outcome.reason() {
            tracing::warn!(page = page.index, "Page recognition degraded: {}", reason);
        }
        page.recognition = outcome.into_value();
        page.release_render();
    }

    fn resolve_image(
        &self,
        document: &SourceDocument,
        deadline: &Deadline,
    ) -> Result<Outcome<String>, DocumentError> {
        let mut reasons = Vec::new();
        let artifact: ImageArtifact = match self
            .enhancer
            .enhance(document.path(), &document.artifact_prefix())
        {
            Outcome::Success(artifact) => artifact,
            Outcome::Degraded { value, reason } => {
                reasons.push(format!("enhancement skipped: {}", reason));
                value
            }
            Outcome::Fatal(reason) => return Err(DocumentError::PreprocessingError(reason)),
        };

        deadline.check()?;
        tracing::debug!(
            document_id = %document.id(),
            enhanced = artifact.is_transient(),
            "Recognizing {}",
            artifact.path().display()
        );
        let recognition = self.resolver.recognize(artifact.path());
        drop(artifact);

        Ok(match recognition {
            Outcome::Success(result) if reasons.is_empty() => Outcome::Success(result.text),
            Outcome::Success(result) => Outcome::degraded(result.text, reasons.join("; ")),
            Outcome::Degraded { value, reason } => {
                reasons.push(reason);
                Outcome::degraded(value.text, reasons.join("; "))
            }
            Outcome::Fatal(reason) => Outcome::degraded(String::new(), reason),
        })
    }
}
