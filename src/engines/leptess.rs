//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy images like phone photos.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use super::{cache_dir, download_file};
use crate::config::Config;
use crate::engine::RecognitionEngine;
use crate::error::DocumentError;
use std::path::{Path, PathBuf};
use tesseract_static::tesseract::Tesseract;

/// Tesseract recognition engine
pub struct LeptessEngine {
    tessdata_path: String,
    language: String,
}

impl LeptessEngine {
    pub fn new(config: &Config) -> Result<Self, DocumentError> {
        let language = config.default_language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&language)?,
        };

        // Fail at startup rather than on the first request
        let handle = Tesseract::new(Some(&tessdata_path), Some(&language)).map_err(|e| {
            DocumentError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(handle);

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self {
            tessdata_path,
            language,
        })
    }
}

impl RecognitionEngine for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(&self, image: &Path) -> Result<String, DocumentError> {
        let img = image::open(image)
            .map_err(|e| DocumentError::ProcessingError(format!("Failed to load image: {}", e)))?;
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        rgb_img
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| {
                DocumentError::ProcessingError(format!("Failed to convert to BMP: {}", e))
            })?;

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| {
                DocumentError::ProcessingError(format!("Failed to create Tesseract: {}", e))
            })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            DocumentError::ProcessingError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess.recognize().map_err(|e| {
            DocumentError::ProcessingError(format!("Failed to recognize text: {}", e))
        })?;

        let text = tess
            .get_text()
            .map_err(|e| DocumentError::ProcessingError(format!("Failed to get text: {}", e)))?;

        tracing::debug!(width, height, "leptess recognized {} chars", text.len());

        Ok(text)
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, DocumentError> {
    let tessdata_dir: PathBuf = cache_dir()?.join("tessdata");
    std::fs::create_dir_all(&tessdata_dir).map_err(|e| {
        DocumentError::InitializationError(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_path = tessdata_dir.join(format!("{}.traineddata", language));

    if !traineddata_path.exists() {
        // tessdata_fast keeps the download small
        let url = format!(
            "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
            language
        );
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&url, &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::info!("Using cached tessdata from {:?}", tessdata_dir);
    }

    // Tesseract expects the directory, not the file
    tessdata_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| DocumentError::InitializationError("Invalid tessdata path".to_string()))
}
