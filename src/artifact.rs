//! Image references handed between pipeline stages.

use crate::error::DocumentError;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// An image on disk that a recognition engine can read.
///
/// `Transient` artifacts belong to a single pipeline run and are deleted as
/// soon as the value is dropped, on success and error paths alike. `Original`
/// references point at files the pipeline does not own and are never removed.
#[derive(Debug)]
pub enum ImageArtifact {
    Original(PathBuf),
    Transient(TempPath),
}

impl ImageArtifact {
    pub fn original(path: impl Into<PathBuf>) -> Self {
        Self::Original(path.into())
    }

    /// Encode `image` as PNG into a new transient file under `dir`.
    pub fn write_transient(
        image: &DynamicImage,
        dir: &Path,
        prefix: &str,
    ) -> Result<Self, DocumentError> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".png")
            .tempfile_in(dir)
            .map_err(|e| {
                DocumentError::Internal(format!(
                    "Failed to create artifact in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        image
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|e| DocumentError::Internal(format!("Failed to write artifact: {}", e)))?;

        Ok(Self::Transient(file.into_temp_path()))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Original(path) => path,
            Self::Transient(path) => path,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
