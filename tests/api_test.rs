use lopdf::dictionary;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use smartdoc_server::analyzer::DocumentAnalyzer;
use smartdoc_server::config::Config;
use smartdoc_server::engine::RecognitionEngine;
use smartdoc_server::engines::EngineInfo;
use smartdoc_server::error::DocumentError;
use smartdoc_server::pipeline::DocumentPipeline;
use smartdoc_server::resolver::RecognitionResolver;
use smartdoc_server::server::{self, AppState};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Recognizes every image as the same text
struct StaticEngine(&'static str);

impl RecognitionEngine for StaticEngine {
    fn name(&self) -> &'static str {
        "static"
    }

    fn description(&self) -> &'static str {
        "Returns fixed text"
    }

    fn recognize(&self, _image: &Path) -> Result<String, DocumentError> {
        Ok(self.0.to_string())
    }
}

struct TestServer {
    base_url: String,
    upload_dir: PathBuf,
    handle: JoinHandle<()>,
    _dirs: (TempDir, TempDir),
}

impl TestServer {
    async fn start(ocr_text: &'static str) -> Self {
        Self::start_with(ocr_text, |_| {}).await
    }

    async fn start_with(ocr_text: &'static str, customize: impl FnOnce(&mut Config)) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();

        let mut config = Config {
            upload_dir: uploads.path().join("uploads"),
            artifact_dir: artifacts.path().to_path_buf(),
            ..Config::default()
        };
        customize(&mut config);
        let upload_dir = config.upload_dir.clone();

        let engine: Arc<dyn RecognitionEngine> = Arc::new(StaticEngine(ocr_text));
        let resolver = RecognitionResolver::new(vec![engine], config.engine_timeout);
        let analyzer = DocumentAnalyzer::new(DocumentPipeline::from_config(resolver, &config));
        let engines = vec![EngineInfo {
            name: "static",
            description: "Returns fixed text",
        }];
        let app = server::router(AppState::new(analyzer, engines, config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            upload_dir,
            handle,
            _dirs: (uploads, artifacts),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn stored_uploads(&self) -> Vec<String> {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn png_bytes() -> Vec<u8> {
    let image = image::GrayImage::from_fn(32, 16, |x, _| {
        image::Luma([if x % 4 < 2 { 10 } else { 240 }])
    });
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn empty_pdf_bytes() -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<lopdf::Object>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

async fn predict(server: &TestServer, filename: &str, data: Vec<u8>) -> (StatusCode, Value) {
    let part = Part::bytes(data).file_name(filename.to_string());
    let form = Form::new().part("file", part);

    let response = reqwest::Client::new()
        .post(server.url("/api/v1/predict"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body = response.json().await.expect("Failed to parse response");
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start("unused").await;

    let body: Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_welcome_and_info() {
    let server = TestServer::start("unused").await;

    let welcome: Value = reqwest::get(server.url("/")).await.unwrap().json().await.unwrap();
    assert!(welcome["message"].as_str().unwrap().contains("/api/v1/predict"));

    let info: Value = reqwest::get(server.url("/info")).await.unwrap().json().await.unwrap();
    assert_eq!(info["default_engine"], "static");
    assert_eq!(info["engines"][0]["name"], "static");
    assert_eq!(info["min_digital_text_chars"], 20);
    let extensions: Vec<&str> = info["supported_extensions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(extensions, [".jpg", ".jpeg", ".png", ".pdf"]);
}

#[tokio::test]
async fn test_invoice_image_is_valid() {
    let server = TestServer::start("TAX INVOICE\nABC Pvt Ltd\nTotal: Rs. 58,400").await;

    let (status, body) = predict(&server, "scan.PNG", png_bytes()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_type"], "invoice");
    assert_eq!(body["fields_extracted"]["vendor"], "ABC Pvt Ltd");
    assert_eq!(body["fields_extracted"]["total_amount"], "₹58,400");
    assert_eq!(body["fields_extracted"]["document_type"], "invoice");
    assert_eq!(body["decision"], "Valid");
    assert_eq!(body["confidence_score"], 0.9);
    assert!(body["explainability_map"].is_null());
    assert!(body["processing_time_ms"].is_u64());

    // the upload is kept under its document id
    let document_id = body["document_id"].as_str().unwrap();
    assert_eq!(
        server.stored_uploads(),
        vec![format!("{}_scan.PNG", document_id)]
    );
}

#[tokio::test]
async fn test_resume_with_ai_is_ranked_high() {
    let server = TestServer::start("Resume\nMohit Kalantri\nSkills: Rust, AI, NLP").await;

    let (status, body) = predict(&server, "cv.jpg", png_bytes()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_type"], "resume");
    assert_eq!(body["fields_extracted"]["candidate_name"], "Mohit Kalantri");
    assert_eq!(body["fields_extracted"]["skills"], "AI, Rust, NLP");
    assert_eq!(body["decision"], "Ranked High");
}

#[tokio::test]
async fn test_unmatched_text_is_reviewed_report() {
    let server = TestServer::start("Minutes of the weekly sync").await;

    let (status, body) = predict(&server, "minutes.jpeg", png_bytes()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_type"], "report");
    assert_eq!(body["fields_extracted"]["summary"], "minutes of the weekly sync");
    assert_eq!(body["decision"], "Reviewed");
}

#[tokio::test]
async fn test_unsupported_extension_is_rejected_before_storage() {
    let server = TestServer::start("invoice abc 58,400").await;

    let (status, body) = predict(&server, "notes.txt", b"invoice".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_FORMAT");
    assert!(server.stored_uploads().is_empty());
}

#[tokio::test]
async fn test_missing_file_field() {
    let server = TestServer::start("unused").await;

    let form = Form::new().text("comment", "no file here");
    let response = reqwest::Client::new()
        .post(server.url("/api/v1/predict"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_FILE");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = TestServer::start_with("unused", |config| config.max_file_size = 1024).await;

    let (status, body) = predict(&server, "big.png", vec![0u8; 4096]).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "FILE_TOO_LARGE");
}

#[tokio::test]
async fn test_blank_recognition_is_validation_error() {
    let server = TestServer::start("   \n  ").await;

    let (status, body) = predict(&server, "blank.png", png_bytes()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"], "No readable text found in the document.");
}

#[tokio::test]
async fn test_pdf_without_pages_is_validation_error() {
    let server = TestServer::start("unused").await;

    let (status, body) = predict(&server, "empty.pdf", empty_pdf_bytes()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "No pages found in PDF file.");
}

#[tokio::test]
async fn test_internal_failure_is_opaque() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let blocked_dir = blocker.path().to_path_buf();
    let server =
        TestServer::start_with("unused", move |config| config.upload_dir = blocked_dir).await;

    let (status, body) = predict(&server, "scan.png", png_bytes()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal processing error.");
    assert_eq!(body["code"], "INTERNAL_ERROR");
}
