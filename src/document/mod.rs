//! Source documents and the pages derived from them.

pub mod rasterizer;
pub mod text_layer;

pub use rasterizer::{PdfRasterizer, Rasterizer};
pub use text_layer::{PdfTextLayer, TextLayer};

use crate::artifact::ImageArtifact;
use crate::engine::RecognitionResult;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload extensions accepted at the boundary (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];

/// Check an uploaded file name against [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_upload(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// A single raster image
    Image,
    /// A multi-page document (PDF)
    Paginated,
}

impl DocumentFormat {
    /// Detect the format from the extension, then from the `%PDF-` magic bytes
    pub fn detect(path: &Path) -> Self {
        if let Some(ext) = path.extension() {
            if ext.to_string_lossy().eq_ignore_ascii_case("pdf") {
                return Self::Paginated;
            }
        }

        let mut magic = [0u8; 5];
        let is_pdf = File::open(path)
            .and_then(|mut file| file.read_exact(&mut magic))
            .is_ok()
            && &magic == b"%PDF-";

        if is_pdf {
            Self::Paginated
        } else {
            Self::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Paginated => "paginated",
        }
    }
}

/// An uploaded document awaiting text resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    id: Uuid,
    path: PathBuf,
    format: DocumentFormat,
}

impl SourceDocument {
    pub fn new(id: Uuid, path: impl Into<PathBuf>, format: DocumentFormat) -> Self {
        Self {
            id,
            path: path.into(),
            format,
        }
    }

    /// Create a document whose format is detected from the file itself
    pub fn detect(id: Uuid, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = DocumentFormat::detect(&path);
        Self::new(id, path, format)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// File name prefix for artifacts created while processing this document
    pub fn artifact_prefix(&self) -> String {
        format!("{}_", self.id)
    }
}

/// One page of a paginated document during a pipeline run
#[derive(Debug)]
pub struct Page {
    pub index: usize,
    render: Option<ImageArtifact>,
    pub recognition: Option<RecognitionResult>,
}

impl Page {
    pub fn new(index: usize, render: ImageArtifact) -> Self {
        Self {
            index,
            render: Some(render),
            recognition: None,
        }
    }

    /// Path of the page render, until it has been released
    pub fn render_path(&self) -> Option<&Path> {
        self.render.as_ref().map(ImageArtifact::path)
    }

    /// Drop the render, deleting it if it is a transient artifact
    pub fn release_render(&mut self) {
        self.render = None;
    }

    pub fn text(&self) -> &str {
        self.recognition
            .as_ref()
            .map(|result| result.text.as_str())
            .unwrap_or_default()
    }
}
