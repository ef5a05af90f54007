//! Recognition engine implementations
//!
//! This module contains implementations of the RecognitionEngine trait for
//! different OCR backends. Engines are conditionally compiled based on feature
//! flags and ordered by the `--engines` option: the first engine is the primary,
//! the rest are fallbacks in order.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::RecognitionEngine;
use crate::error::DocumentError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// Engines initialized once at startup, in fallback order
#[derive(Clone)]
pub struct EngineRegistry {
    engines: Vec<Arc<dyn RecognitionEngine>>,
}

impl EngineRegistry {
    /// Initialize every engine named in the configuration, in order
    pub fn new(config: &Config) -> Result<Self, DocumentError> {
        let mut engines: Vec<Arc<dyn RecognitionEngine>> = Vec::new();

        for name in &config.engines {
            match init_engine(name, config)? {
                Some(engine) => {
                    if engines.iter().any(|e| e.name() == engine.name()) {
                        tracing::warn!("Engine '{}' listed twice, ignoring duplicate", name);
                        continue;
                    }
                    engines.push(engine);
                }
                None => {
                    tracing::warn!(
                        "Engine '{}' is unknown or not compiled into this build, skipping",
                        name
                    );
                }
            }
        }

        if engines.is_empty() {
            return Err(DocumentError::InitializationError(
                "No recognition engines available. \
                 Build with --features engine-ocrs or --features engine-leptess"
                    .to_string(),
            ));
        }

        Ok(Self::from_engines(engines))
    }

    /// Build a registry from already constructed engines
    pub fn from_engines(engines: Vec<Arc<dyn RecognitionEngine>>) -> Self {
        Self { engines }
    }

    /// Engines in fallback order
    pub fn ordered(&self) -> Vec<Arc<dyn RecognitionEngine>> {
        self.engines.clone()
    }

    /// Name of the primary engine
    pub fn default_name(&self) -> Option<&str> {
        self.engines.first().map(|e| e.name())
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
            })
            .collect()
    }
}

#[allow(unused_variables)]
fn init_engine(
    name: &str,
    config: &Config,
) -> Result<Option<Arc<dyn RecognitionEngine>>, DocumentError> {
    match name {
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => {
            tracing::info!("Initializing ocrs engine...");
            Ok(Some(Arc::new(ocrs::OcrsEngine::new(config)?)))
        }
        #[cfg(feature = "engine-leptess")]
        "leptess" => {
            tracing::info!("Initializing leptess engine...");
            Ok(Some(Arc::new(leptess::LeptessEngine::new(config)?)))
        }
        _ => Ok(None),
    }
}

/// Cache directory for downloaded model data
#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
fn cache_dir() -> Result<std::path::PathBuf, DocumentError> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("smartdoc");

    std::fs::create_dir_all(&dir).map_err(|e| {
        DocumentError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    Ok(dir)
}

/// Download a file from URL to path using ureq
#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
fn download_file(url: &str, path: &std::path::Path) -> Result<(), DocumentError> {
    use std::io::Write;

    let response = ureq::get(url).call().map_err(|e| {
        DocumentError::InitializationError(format!("Failed to download {}: {}", url, e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        DocumentError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    let mut file = std::fs::File::create(path).map_err(|e| {
        DocumentError::InitializationError(format!("Failed to create {}: {}", path.display(), e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        DocumentError::InitializationError(format!("Failed to write {}: {}", path.display(), e))
    })?;

    Ok(())
}
