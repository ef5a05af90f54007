use crate::analyzer::DocumentAnalyzer;
use crate::config::Config;
use crate::decision::{
    DecisionStatus, ExplainabilityMap, FixedConfidence, RuleBasedDecisionEngine,
};
use crate::document::{is_supported_upload, SUPPORTED_EXTENSIONS};
use crate::engines::{EngineInfo, EngineRegistry};
use crate::error::DocumentError;
use crate::extraction::{ExtractedFields, RuleBasedExtractor, RuleSet};
use crate::pipeline::DocumentPipeline;
use crate::resolver::RecognitionResolver;
use crate::uploads::UploadStore;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<DocumentAnalyzer>,
    pub uploads: UploadStore,
    pub engines: Arc<Vec<EngineInfo>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(analyzer: DocumentAnalyzer, engines: Vec<EngineInfo>, config: Config) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            uploads: UploadStore::new(config.upload_dir.clone()),
            engines: Arc::new(engines),
            config: Arc::new(config),
        }
    }

    /// Initialize the engines and the analysis stack described by `config`
    pub fn from_config(config: Config) -> Result<Self, DocumentError> {
        let registry = EngineRegistry::new(&config)?;
        tracing::info!(
            engines = ?registry.list(),
            default = registry.default_name().unwrap_or_default(),
            "Recognition engines ready"
        );

        let resolver = RecognitionResolver::new(registry.ordered(), config.engine_timeout);
        let pipeline = DocumentPipeline::from_config(resolver, &config);

        let mut analyzer = DocumentAnalyzer::new(pipeline);
        if let Some(path) = &config.rules_file {
            let rules = RuleSet::from_json_file(path)?;
            let decider =
                RuleBasedDecisionEngine::new(rules.decisions.clone(), FixedConfidence::default());
            analyzer = analyzer
                .with_decision_engine(decider)
                .with_extractor(RuleBasedExtractor::new(rules));
        }

        Ok(Self::new(analyzer, registry.info(), config))
    }
}

#[derive(Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Prediction response
#[derive(Serialize)]
pub struct PredictionResponse {
    pub document_id: String,
    pub document_type: String,
    pub fields_extracted: ExtractedFields,
    pub decision: DecisionStatus,
    pub confidence_score: f64,
    pub explainability_map: Option<ExplainabilityMap>,
    pub processing_time_ms: u64,
    pub warnings: Vec<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: Option<String>,
    pub engines: Vec<EngineInfo>,
    pub supported_extensions: Vec<String>,
    pub max_file_size_bytes: usize,
    pub min_digital_text_chars: usize,
    pub default_language: String,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handle_welcome))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/api/v1/predict", post(handle_predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn multipart_error(error: MultipartError, max: usize) -> DocumentError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DocumentError::BodyTooLarge { max }
    } else {
        DocumentError::InvalidRequest(format!("Failed to parse multipart: {}", error))
    }
}

/// Handle document prediction requests
async fn handle_predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, DocumentError> {
    let start = Instant::now();
    let max_file_size = state.config.max_file_size;

    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // reject before reading the body
        let filename = field.file_name().unwrap_or_default().to_string();
        if !is_supported_upload(&filename) {
            return Err(DocumentError::UnsupportedFormat(format!(
                "'{}' (accepted: .jpg, .jpeg, .png, .pdf)",
                filename
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or(DocumentError::MissingFile)?;

    if data.len() > max_file_size {
        return Err(DocumentError::FileTooLarge {
            size: data.len(),
            max: max_file_size,
        });
    }

    let document = state.uploads.save(&filename, &data).await?;

    let analyzer = Arc::clone(&state.analyzer);
    let task_document = document.clone();
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&task_document))
        .await
        .map_err(|e| DocumentError::Internal(format!("Analysis task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        document_id = %document.id(),
        decision = analysis.decision.status.as_str(),
        warnings = analysis.warnings.len(),
        "Prediction completed in {}ms",
        processing_time_ms
    );

    Ok(Json(PredictionResponse {
        document_id: document.id().to_string(),
        document_type: analysis
            .fields
            .document_type()
            .unwrap_or_default()
            .to_string(),
        fields_extracted: analysis.fields,
        decision: analysis.decision.status,
        confidence_score: analysis.decision.confidence,
        explainability_map: analysis.decision.explainability,
        processing_time_ms,
        warnings: analysis.warnings,
    }))
}

async fn handle_welcome() -> impl IntoResponse {
    Json(WelcomeResponse {
        message: "Welcome to smartdoc-server. POST a document to /api/v1/predict.".to_string(),
    })
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.engines.first().map(|e| e.name.to_string()),
        engines: state.engines.as_ref().clone(),
        supported_extensions: SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
        min_digital_text_chars: state.config.min_digital_text_chars,
        default_language: state.config.default_language.clone(),
    })
}
