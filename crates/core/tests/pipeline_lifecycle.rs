//! Request lifecycle integration tests.
//!
//! These tests drive scratch storage, the two-stage pipeline and the artifact
//! registry together with a mock converter:
//! - Chunked ingest followed by both conversions
//! - Cleanup of every request file on success and on failure
//! - Previews kept resident and resolvable by name
//! - Concurrent requests never sharing files

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use tempfile::TempDir;

use previewer_core::{
    testing::MockConverter, ArtifactRegistry, ArtifactSet, PipelineStage, PreviewFormat,
    RequestState, RequestTrace, ScratchDir, StorageError, TranscodePipeline,
};

/// Test helper wiring storage, pipeline and registry to one scratch dir.
struct TestHarness {
    scratch: ScratchDir,
    registry: ArtifactRegistry,
    pipeline: TranscodePipeline,
    converter: Arc<MockConverter>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new(format: PreviewFormat) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let converter = Arc::new(MockConverter::new());
        Self {
            scratch: ScratchDir::new(temp_dir.path()),
            registry: ArtifactRegistry::new(temp_dir.path()),
            pipeline: TranscodePipeline::new(converter.clone(), format),
            converter,
            temp_dir,
        }
    }

    fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    async fn ingest_chunks(&self, chunks: &[&'static [u8]]) -> Result<PathBuf, StorageError> {
        let chunks: Vec<Result<Bytes, std::io::Error>> = chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Ok(self.scratch.ingest(stream::iter(chunks)).await?.path)
    }
}

#[tokio::test]
async fn test_inline_request_leaves_nothing_behind() {
    let harness = TestHarness::new(PreviewFormat::WebP);
    let mut trace = RequestTrace::new("inline-1");

    let input = harness
        .ingest_chunks(&[b"first chunk, ", b"second chunk"])
        .await
        .unwrap();
    assert_eq!(std::fs::read(&input).unwrap(), b"first chunk, second chunk");
    let mut artifacts = ArtifactSet::new();
    artifacts.track(&input);
    trace.advance();

    let output = harness
        .pipeline
        .run(&mut trace, &input, &mut artifacts)
        .await
        .unwrap();
    assert_eq!(trace.state(), RequestState::PreviewConverted);

    assert_eq!(
        std::fs::read(&output.preview).unwrap(),
        b"first chunk, second chunk"
    );
    assert_eq!(harness.files().len(), 3);

    assert_eq!(artifacts.release(), 3);
    assert!(harness.files().is_empty());
}

#[tokio::test]
async fn test_url_request_keeps_only_the_preview() {
    let harness = TestHarness::new(PreviewFormat::WebM);
    let mut trace = RequestTrace::new("url-1");

    let input = harness.ingest_chunks(&[b"video"]).await.unwrap();
    let mut artifacts = ArtifactSet::new();
    artifacts.track(&input);
    trace.advance();

    let output = harness
        .pipeline
        .run(&mut trace, &input, &mut artifacts)
        .await
        .unwrap();

    let name = harness.registry.register(&output.preview).await.unwrap();
    assert!(artifacts.persist(&output.preview));
    drop(artifacts);

    assert_eq!(harness.files(), vec![output.preview.clone()]);
    assert!(name.ends_with(".webm"));
    assert_eq!(harness.registry.resolve(&name).await, Some(output.preview));
}

#[tokio::test]
async fn test_failed_request_cleans_up() {
    let harness = TestHarness::new(PreviewFormat::WebP);
    harness.converter.fail_at(PipelineStage::Preview).await;
    let mut trace = RequestTrace::new("failing-1");

    let input = harness.ingest_chunks(&[b"video"]).await.unwrap();
    let mut artifacts = ArtifactSet::new();
    artifacts.track(&input);
    trace.advance();

    let err = harness
        .pipeline
        .run(&mut trace, &input, &mut artifacts)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), PipelineStage::Preview);
    assert_eq!(trace.state(), RequestState::Failed(PipelineStage::Preview));
    // Intermediate is still there until the set goes away
    assert_eq!(harness.files().len(), 2);
    drop(artifacts);
    assert!(harness.files().is_empty());
}

#[tokio::test]
async fn test_broken_upload_stream_leaves_no_file() {
    let harness = TestHarness::new(PreviewFormat::WebP);
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        )),
    ];

    let err = harness.scratch.ingest(stream::iter(chunks)).await.unwrap_err();

    assert!(err.is_client_error());
    assert!(harness.files().is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_use_distinct_files() {
    let harness = Arc::new(TestHarness::new(PreviewFormat::WebM));
    harness
        .converter
        .set_conversion_duration(Duration::from_millis(20))
        .await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let harness = harness.clone();
        handles.push(tokio::spawn(async move {
            let input = harness.ingest_chunks(&[b"same bytes"]).await.unwrap();
            let mut artifacts = ArtifactSet::new();
            artifacts.track(&input);
            let mut trace = RequestTrace::new(format!("req-{}", i));
            trace.advance();
            let output = harness
                .pipeline
                .run(&mut trace, &input, &mut artifacts)
                .await
                .unwrap();
            artifacts.persist(&output.preview);
            output.preview
        }));
    }

    let mut previews = Vec::new();
    for handle in handles {
        previews.push(handle.await.unwrap());
    }
    previews.sort();
    previews.dedup();

    assert_eq!(previews.len(), 8);
    assert_eq!(harness.files(), previews);
    assert_eq!(harness.converter.successful_count().await, 16);
}
