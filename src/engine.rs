use crate::error::DocumentError;
use std::path::Path;

/// Text recognized from a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub text: String,
    /// Engine that produced `text`, or the last engine tried when all failed.
    pub engine: String,
    pub success: bool,
}

impl RecognitionResult {
    /// Build a result; success is derived from the text so that an empty
    /// result can never be reported as successful.
    pub fn new(text: impl Into<String>, engine: impl Into<String>) -> Self {
        let text = text.into();
        let success = !text.trim().is_empty();
        Self {
            text,
            engine: engine.into(),
            success,
        }
    }

    pub fn empty(engine: impl Into<String>) -> Self {
        Self::new(String::new(), engine)
    }
}

/// Trait that all recognition engines must implement
pub trait RecognitionEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text in the raster image stored at `image`
    fn recognize(&self, image: &Path) -> Result<String, DocumentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_never_successful() {
        assert!(!RecognitionResult::new("   \n", "ocrs").success);
        assert!(!RecognitionResult::empty("leptess").success);
        assert!(RecognitionResult::new("Invoice", "ocrs").success);
    }
}
