//! Embedded ("digital") text extraction for paginated documents.

use crate::error::DocumentError;
use crate::outcome::Outcome;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Recovers text that is embedded in a document without running OCR
pub trait TextLayer: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Text layer reader backed by `pdf-extract`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        // pdf_extract can panic on malformed PDFs
        let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(DocumentError::ProcessingError(format!(
                "Failed to parse PDF: {}",
                e
            ))),
            Err(_) => Err(DocumentError::ProcessingError(
                "PDF text extraction panicked (malformed PDF)".to_string(),
            )),
        }
    }
}

/// Read the text layer and decide whether it can stand in for OCR.
///
/// Returns `Success` only when the trimmed text is longer than `min_chars`.
/// Short text and extraction failures come back as `Degraded` so the caller
/// moves on to rasterization; nothing here is fatal.
pub fn read_digital_text(layer: &dyn TextLayer, path: &Path, min_chars: usize) -> Outcome<String> {
    match layer.extract_text(path) {
        Ok(text) => {
            let usable = text.trim().chars().count();
            if usable > min_chars {
                tracing::info!(chars = usable, "Extracted text directly from PDF without OCR");
                Outcome::Success(text)
            } else {
                tracing::info!(
                    chars = usable,
                    min_chars,
                    "PDF text layer too short, falling back to OCR"
                );
                Outcome::degraded(
                    text,
                    format!("digital text below threshold ({} chars)", usable),
                )
            }
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "PDF text layer extraction failed: {}", e);
            Outcome::degraded(String::new(), e.to_string())
        }
    }
}
