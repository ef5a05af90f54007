use super::steps;
use crate::artifact::ImageArtifact;
use crate::error::DocumentError;
use crate::outcome::Outcome;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Raises recognition accuracy of standalone images by binarizing them.
///
/// The enhanced image is written as a transient artifact next to the other
/// per-run artifacts. Enhancement never fails the caller: when anything goes
/// wrong the original reference comes back as a degraded outcome.
#[derive(Debug, Clone)]
pub struct ImageEnhancer {
    artifact_dir: PathBuf,
}

impl ImageEnhancer {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn enhance(&self, source: &Path, prefix: &str) -> Outcome<ImageArtifact> {
        match self.try_enhance(source, prefix) {
            Ok(artifact) => Outcome::Success(artifact),
            Err(e) => {
                tracing::error!(
                    source = %source.display(),
                    "Image enhancement failed, using original image: {}",
                    e
                );
                Outcome::degraded(ImageArtifact::original(source), e.to_string())
            }
        }
    }

    fn try_enhance(&self, source: &Path, prefix: &str) -> Result<ImageArtifact, DocumentError> {
        let start = Instant::now();

        let image = image::open(source).map_err(|e| {
            DocumentError::PreprocessingError(format!("Failed to load image: {}", e))
        })?;
        let gray = steps::grayscale::apply(&image);
        let (binarized, level) = steps::threshold::apply(&gray);

        let artifact = ImageArtifact::write_transient(
            &image::DynamicImage::ImageLuma8(binarized),
            &self.artifact_dir,
            &format!("{}enhanced_", prefix),
        )?;

        tracing::info!(
            level,
            time_ms = start.elapsed().as_millis() as u64,
            "Enhanced image saved at {}",
            artifact.path().display()
        );

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_enhance_writes_binarized_transient_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        let mut img = RgbImage::from_pixel(40, 20, Rgb([220, 215, 200]));
        for x in 5..35 {
            img.put_pixel(x, 10, Rgb([20, 20, 40]));
        }
        img.save(&source).unwrap();

        let enhancer = ImageEnhancer::new(dir.path());
        let outcome = enhancer.enhance(&source, "abc_");

        let artifact = match outcome {
            Outcome::Success(artifact) => artifact,
            other => panic!("expected success, got {:?}", other),
        };
        assert!(artifact.is_transient());
        assert_ne!(artifact.path(), source.as_path());

        let enhanced = image::open(artifact.path()).unwrap().to_luma8();
        assert!(enhanced.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(enhanced.get_pixel(20, 10), &Luma([0]));
        assert_eq!(enhanced.get_pixel(20, 2), &Luma([255]));

        let enhanced_path = artifact.path().to_path_buf();
        drop(artifact);
        assert!(!enhanced_path.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_enhance_falls_back_to_original_on_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"definitely not an image").unwrap();

        let outcome = ImageEnhancer::new(dir.path()).enhance(&source, "abc_");

        assert!(outcome.is_degraded());
        let artifact = outcome.into_value().unwrap();
        assert!(!artifact.is_transient());
        assert_eq!(artifact.path(), source.as_path());
    }

    #[test]
    fn test_enhance_falls_back_when_artifact_dir_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.png");
        GrayImage::from_pixel(8, 8, Luma([128])).save(&source).unwrap();

        let enhancer = ImageEnhancer::new(dir.path().join("does-not-exist"));
        let outcome = enhancer.enhance(&source, "abc_");

        assert!(outcome.is_degraded());
        assert_eq!(outcome.value().unwrap().path(), source.as_path());
    }
}
