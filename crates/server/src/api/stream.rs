//! Streaming finished files back to clients.

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use previewer_core::{content_type_for, ArtifactSet, PipelineStage, RequestState, RequestTrace};

use super::error::ApiError;
use crate::state::AppState;

/// Errors that can occur before the first body byte is sent.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {path}")]
    NotAFile { path: PathBuf },
}

impl StreamError {
    /// Whether the file was missing rather than unreadable.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Open { source, .. } | Self::Metadata { source, .. } => {
                source.kind() == ErrorKind::NotFound
            }
            Self::NotAFile { .. } => false,
        }
    }
}

/// File body that owns the request artifacts and trace until it is dropped.
///
/// The trace reaches `Streamed` once the last byte has been handed to the
/// connection and `CleanedUp` once the artifacts are gone. A body dropped
/// early leaves it in `Failed(Stream)`.
struct GuardedStream {
    inner: Option<ReaderStream<File>>,
    remaining: u64,
    artifacts: Option<ArtifactSet>,
    trace: Option<RequestTrace>,
}

impl GuardedStream {
    fn new(
        file: File,
        len: u64,
        artifacts: Option<ArtifactSet>,
        trace: Option<RequestTrace>,
    ) -> Self {
        Self {
            inner: Some(ReaderStream::new(file)),
            remaining: len,
            artifacts,
            trace,
        }
    }

    fn mark_streamed(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            if trace.state() == RequestState::PreviewConverted {
                trace.advance();
            }
        }
    }

    fn mark_failed(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            trace.fail_at(PipelineStage::Stream);
        }
    }

    /// Closes the file, removes the artifacts and settles the trace.
    fn finish(&mut self) {
        // The handle has to be closed before the file is removed
        self.inner = None;
        drop(self.artifacts.take());

        if let Some(trace) = self.trace.as_mut() {
            if trace.state() == RequestState::Streamed {
                trace.advance();
            } else {
                trace.fail_at(PipelineStage::Stream);
            }
        }
    }
}

impl Stream for GuardedStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let polled = Pin::new(inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
                if this.remaining == 0 {
                    this.mark_streamed();
                }
            }
            Poll::Ready(Some(Err(e))) => {
                warn!(error = %e, "Read failed mid-stream");
                this.mark_failed();
            }
            Poll::Ready(None) if this.remaining == 0 => this.mark_streamed(),
            // File shrank underneath us
            Poll::Ready(None) => this.mark_failed(),
            Poll::Pending => {}
        }
        polled
    }
}

impl Drop for GuardedStream {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Builds a streaming response for the file at `path`.
///
/// `Content-Length` is the file size and `Content-Type` follows the
/// extension. `cleanup` and `trace` move into the body: the artifacts are
/// removed once it has been sent or the client goes away, and the trace
/// records how far delivery got. When no response can be built the
/// artifacts are removed right away and the trace is failed.
pub async fn stream_file(
    path: &Path,
    cleanup: Option<ArtifactSet>,
    mut trace: Option<RequestTrace>,
) -> Result<Response, StreamError> {
    let opened = open_regular(path).await;
    let (file, len) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            if let Some(trace) = trace.as_mut() {
                trace.fail_at(PipelineStage::Stream);
            }
            return Err(e);
        }
    };

    debug!(path = %path.display(), len, "Streaming file");

    let body = Body::from_stream(GuardedStream::new(file, len, cleanup, trace));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(path).to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        body,
    )
        .into_response())
}

async fn open_regular(path: &Path) -> Result<(File, u64), StreamError> {
    let file = File::open(path).await.map_err(|source| StreamError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let metadata = file
        .metadata()
        .await
        .map_err(|source| StreamError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
    // Opening a directory succeeds on unix
    if !metadata.is_file() {
        return Err(StreamError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok((file, metadata.len()))
}

/// `GET /stream/{file_name}`: serves a preview left behind by a URL-mode upload.
pub async fn get_preview(
    State(state): State<Arc<AppState>>,
    UrlPath(file_name): UrlPath<String>,
) -> Response {
    let mode = state.mode();
    let Some(path) = state.registry().resolve(&file_name).await else {
        debug!(file_name = %file_name, "Unknown preview requested");
        return ApiError::NotFound.into_response_for(mode);
    };

    match stream_file(&path, None, None).await {
        Ok(response) => response,
        Err(e) if e.is_not_found() => {
            warn!(file_name = %file_name, "Registered preview is gone from disk");
            state.registry().remove(&file_name).await;
            ApiError::NotFound.into_response_for(mode)
        }
        Err(e) => ApiError::Stream(e).into_response_for(mode),
    }
}
