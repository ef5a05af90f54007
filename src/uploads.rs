//! Persistent storage for uploaded documents.

use crate::document::SourceDocument;
use crate::error::DocumentError;
use std::path::PathBuf;
use uuid::Uuid;

/// Stores each upload as `<uuid>_<file name>` under one directory.
///
/// Uploads are retained after processing.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<SourceDocument, DocumentError> {
        let id = Uuid::new_v4();
        let path = self.dir.join(format!("{}_{}", id, sanitize_filename(filename)));

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            DocumentError::Internal(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;
        tokio::fs::write(&path, data).await.map_err(|e| {
            DocumentError::Internal(format!("Failed to store upload {}: {}", path.display(), e))
        })?;

        tracing::info!(
            document_id = %id,
            size = data.len(),
            "Stored upload at {}",
            path.display()
        );

        Ok(SourceDocument::detect(id, path))
    }
}

/// Keep only the final path component, replacing anything outside a safe set
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
