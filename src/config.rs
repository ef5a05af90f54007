use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "smartdoc-server")]
#[command(about = "Document understanding server: text recovery, field extraction and decisions")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "SMARTDOC_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SMARTDOC_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "SMARTDOC_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Directory where uploaded documents are stored
    #[arg(long, env = "SMARTDOC_UPLOAD_DIR", default_value = "data/uploads")]
    pub upload_dir: PathBuf,

    /// Directory for per-request artifacts (page renders, enhanced images)
    #[arg(long, env = "SMARTDOC_ARTIFACT_DIR")]
    pub artifact_dir: Option<PathBuf>,

    /// Recognition engines in fallback order
    #[arg(
        long,
        env = "SMARTDOC_ENGINES",
        value_delimiter = ',',
        default_value = "ocrs,leptess"
    )]
    pub engines: Vec<String>,

    /// Timeout for a single engine call in seconds (0 disables)
    #[arg(long, env = "SMARTDOC_ENGINE_TIMEOUT_SECS", default_value = "30")]
    pub engine_timeout_secs: u64,

    /// Deadline for resolving one document in seconds (0 disables)
    #[arg(long, env = "SMARTDOC_DOCUMENT_DEADLINE_SECS", default_value = "120")]
    pub document_deadline_secs: u64,

    /// Embedded PDF text shorter than this (after trimming) falls back to OCR
    #[arg(long, env = "SMARTDOC_MIN_DIGITAL_TEXT_CHARS", default_value = "20")]
    pub min_digital_text_chars: usize,

    /// Number of pages recognized concurrently within one document
    #[arg(long, env = "SMARTDOC_PAGE_WORKERS", default_value = "1")]
    pub page_workers: usize,

    /// JSON file replacing the built-in extraction schemas and decision rules
    #[arg(long, env = "SMARTDOC_RULES_FILE")]
    pub rules_file: Option<PathBuf>,

    /// Default language for OCR (e.g., "eng", "deu", "fra")
    #[arg(long, env = "SMARTDOC_DEFAULT_LANGUAGE", default_value = "eng")]
    pub default_language: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub upload_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub engines: Vec<String>,
    pub engine_timeout: Option<Duration>,
    pub document_deadline: Option<Duration>,
    pub min_digital_text_chars: usize,
    pub page_workers: usize,
    pub rules_file: Option<PathBuf>,
    pub default_language: String,
    pub tessdata_path: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            upload_dir: args.upload_dir,
            artifact_dir: args.artifact_dir.unwrap_or_else(std::env::temp_dir),
            engines: args
                .engines
                .into_iter()
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            engine_timeout: seconds(args.engine_timeout_secs),
            document_deadline: seconds(args.document_deadline_secs),
            min_digital_text_chars: args.min_digital_text_chars,
            page_workers: args.page_workers.max(1),
            rules_file: args.rules_file,
            default_language: args.default_language,
            tessdata_path: args.tessdata_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_file_size: 50 * 1024 * 1024,
            upload_dir: PathBuf::from("data/uploads"),
            artifact_dir: std::env::temp_dir(),
            engines: vec!["ocrs".to_string(), "leptess".to_string()],
            engine_timeout: seconds(30),
            document_deadline: seconds(120),
            min_digital_text_chars: 20,
            page_workers: 1,
            rules_file: None,
            default_language: "eng".to_string(),
            tessdata_path: None,
        }
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_convert_to_config() {
        let args = Args::parse_from([
            "smartdoc-server",
            "--engines",
            "Leptess, ocrs",
            "--engine-timeout-secs",
            "0",
            "--page-workers",
            "0",
            "--artifact-dir",
            "/tmp/artifacts",
        ]);
        let config = Config::from(args);

        assert_eq!(config.engines, vec!["leptess", "ocrs"]);
        assert_eq!(config.engine_timeout, None);
        assert_eq!(config.document_deadline, Some(Duration::from_secs(120)));
        assert_eq!(config.page_workers, 1);
        assert_eq!(config.min_digital_text_chars, 20);
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/artifacts"));
    }
}
