//! Types for the transcode pipeline.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::converter::{ConverterError, PreviewFormat};

/// Step of request handling a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Copying the upload into scratch storage.
    Ingest,
    /// Stage 1: input to H.264/AAC MP4.
    Intermediate,
    /// Stage 2: MP4 to preview format.
    Preview,
    /// Sending the finished file to the client.
    Stream,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Intermediate => "intermediate",
            Self::Preview => "preview",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single upload request.
///
/// ```text
/// Received -> Ingested -> IntermediateConverted -> PreviewConverted -> Streamed -> CleanedUp
///     \__________\______________\_______________________\_______________\----> Failed(stage)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Ingested,
    IntermediateConverted,
    PreviewConverted,
    Streamed,
    CleanedUp,
    Failed(PipelineStage),
}

impl RequestState {
    /// The state that follows on success, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Ingested),
            Self::Ingested => Some(Self::IntermediateConverted),
            Self::IntermediateConverted => Some(Self::PreviewConverted),
            Self::PreviewConverted => Some(Self::Streamed),
            Self::Streamed => Some(Self::CleanedUp),
            Self::CleanedUp | Self::Failed(_) => None,
        }
    }

    /// The stage whose work moves the request out of this state.
    pub fn pending_stage(self) -> Option<PipelineStage> {
        match self {
            Self::Received => Some(PipelineStage::Ingest),
            Self::Ingested => Some(PipelineStage::Intermediate),
            Self::IntermediateConverted => Some(PipelineStage::Preview),
            Self::PreviewConverted => Some(PipelineStage::Stream),
            Self::Streamed | Self::CleanedUp | Self::Failed(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CleanedUp | Self::Failed(_))
    }
}

/// Tracks and logs the state of one request.
#[derive(Debug)]
pub struct RequestTrace {
    request_id: String,
    state: RequestState,
}

impl RequestTrace {
    pub fn new(request_id: impl Into<String>) -> Self {
        let trace = Self {
            request_id: request_id.into(),
            state: RequestState::Received,
        };
        debug!(request_id = %trace.request_id, state = ?trace.state, "Request state");
        trace
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Moves to the successor state. Terminal states stay put.
    pub fn advance(&mut self) -> RequestState {
        if let Some(next) = self.state.next() {
            self.state = next;
            debug!(request_id = %self.request_id, state = ?self.state, "Request state");
        }
        self.state
    }

    /// Moves to `Failed` for the stage currently in progress.
    pub fn fail(&mut self) -> RequestState {
        if let Some(stage) = self.state.pending_stage() {
            self.state = RequestState::Failed(stage);
            debug!(request_id = %self.request_id, state = ?self.state, "Request state");
        }
        self.state
    }

    /// Moves to `Failed(stage)` when the failing stage is already known.
    pub fn fail_at(&mut self, stage: PipelineStage) -> RequestState {
        if !self.state.is_terminal() {
            self.state = RequestState::Failed(stage);
            debug!(request_id = %self.request_id, state = ?self.state, "Request state");
        }
        self.state
    }
}

/// Files produced by a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Stage 1 output.
    pub intermediate: PathBuf,
    /// Stage 2 output.
    pub preview: PathBuf,
    /// Format of `preview`.
    pub preview_format: PreviewFormat,
    /// Size of `preview` in bytes.
    pub preview_size_bytes: u64,
}

/// Errors that stop a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} conversion failed: {source}")]
    Conversion {
        stage: PipelineStage,
        #[source]
        source: ConverterError,
    },
}

impl PipelineError {
    /// Stage the run stopped at.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Conversion { stage, .. } => *stage,
        }
    }
}
