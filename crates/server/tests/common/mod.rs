//! Common test utilities for in-process HTTP testing with a mock converter.
//!
//! This module provides a test fixture that builds the real router around a
//! [`MockConverter`], with a temporary scratch directory, so uploads run
//! end to end without ffmpeg.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use previewer_core::testing::MockConverter;
use previewer_core::{Config, DeliveryMode, PipelineConfig, StorageConfig, TranscodePipeline};
use previewer_server::{api::create_router, state::AppState};

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "previewer-test-boundary";

/// Test fixture for upload and stream testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new(DeliveryMode::Inline);
///
///     let response = fixture.upload("file", "clip.mov", b"frames").await;
///
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - inspect jobs, inject failures
    pub converter: Arc<MockConverter>,
    /// Shared state behind the router - inspect the registry
    pub state: Arc<AppState>,
    /// Temporary scratch directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON, `Null` when empty or not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Create a fixture delivering previews the given way.
    pub fn new(mode: DeliveryMode) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            storage: StorageConfig {
                scratch_dir: temp_dir.path().to_path_buf(),
            },
            pipeline: PipelineConfig {
                mode,
                preview_format: None,
            },
            ..Default::default()
        };

        let converter = Arc::new(MockConverter::new());
        let pipeline = TranscodePipeline::new(
            converter.clone(),
            config.pipeline.effective_preview_format(),
        );
        let state = Arc::new(AppState::new(config, pipeline));
        let router = create_router(state.clone());

        Self {
            router,
            converter,
            state,
            temp_dir,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Files currently in the scratch directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.temp_dir.path())
            .expect("Failed to read scratch dir")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect();
        files.sort();
        files
    }

    /// Upload `content` as a multipart field named `field`.
    pub async fn upload(&self, field: &str, file_name: &str, content: &[u8]) -> TestResponse {
        self.post_multipart("/upload", multipart_body(field, file_name, content))
            .await
    }

    /// Send a POST request with a prebuilt multipart body.
    pub async fn post_multipart(&self, path: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request with custom content type (for testing non-multipart bodies).
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Builds a multipart/form-data body with a single file field.
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Builds a multipart/form-data body with a single text field.
pub fn multipart_text_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"\r\n\r\n{v}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        v = value
    )
    .into_bytes()
}
