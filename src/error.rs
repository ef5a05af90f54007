use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned to clients for every server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal processing error.";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to initialize recognition engine: {0}")]
    InitializationError(String),

    #[error("Failed to process document: {0}")]
    ProcessingError(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Unreadable paginated document: {0}")]
    UnreadableDocument(String),

    #[error("Engine '{engine}' timed out after {timeout_ms}ms")]
    EngineTimeout { engine: String, timeout_ms: u64 },

    #[error("Document deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded { deadline_ms: u64 },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Request body exceeds the {max} byte limit")]
    BodyTooLarge { max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl DocumentError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            DocumentError::InitializationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR")
            }
            DocumentError::ProcessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
            }
            DocumentError::PreprocessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PREPROCESSING_ERROR")
            }
            DocumentError::UnreadableDocument(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNREADABLE_DOCUMENT")
            }
            DocumentError::EngineTimeout { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_TIMEOUT")
            }
            DocumentError::DeadlineExceeded { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DEADLINE_EXCEEDED")
            }
            DocumentError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
            DocumentError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            DocumentError::BodyTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            DocumentError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            DocumentError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            DocumentError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            DocumentError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for DocumentError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Server-side failures are logged in full and reported opaquely.
        let error = if status.is_server_error() {
            tracing::error!(code, "Request failed: {}", self);
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            tracing::warn!(code, "Request rejected: {}", self);
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
