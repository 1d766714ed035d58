//! Errors returned by the upload and stream endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use previewer_core::{
    ConverterError, DeliveryMode, PipelineError, PipelineStage, PreviewFormat, RegistryError,
    StorageError,
};

use super::stream::StreamError;

/// Everything that can end an upload or stream request early.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carried no readable `file` field.
    #[error("Malformed upload request: {0}")]
    RequestMalformed(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{stage} conversion failed: {source}")]
    Conversion {
        stage: PipelineStage,
        format: PreviewFormat,
        #[source]
        source: ConverterError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Not found")]
    NotFound,
}

/// Body of a failed upload in URL mode.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: &'static str,
}

impl ApiError {
    /// Wraps a pipeline failure; `format` names stage 2 in the message.
    pub fn from_pipeline(err: PipelineError, format: PreviewFormat) -> Self {
        match err {
            PipelineError::Conversion { stage, source } => Self::Conversion {
                stage,
                format,
                source,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RequestMalformed(_) => StatusCode::BAD_REQUEST,
            Self::Storage(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Conversion { .. } | Self::Registry(_) | Self::Stream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Fixed client-facing message. Details stay in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            Self::RequestMalformed(_) => "Failed to get file from request.",
            Self::Storage(StorageError::UploadStream { .. }) => "Failed to get file from request.",
            Self::Storage(StorageError::CreateFailed { .. }) => "Failed to create temporary file.",
            Self::Storage(StorageError::CopyFailed { .. }) => {
                "Failed to copy file to temporary location."
            }
            Self::Conversion { stage, format, .. } => match (stage, format) {
                (PipelineStage::Preview, PreviewFormat::WebP) => "Failed to convert MP4 to WebP.",
                (PipelineStage::Preview, PreviewFormat::WebM) => "Failed to convert MP4 to WebM.",
                _ => "Failed to convert file to MP4.",
            },
            Self::Registry(_) => "Failed to register converted file.",
            Self::Stream(_) => "Failed to stream file to client.",
            Self::NotFound => "",
        }
    }

    /// Request step this error belongs to, if it is part of an upload.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::RequestMalformed(_) | Self::Storage(_) => Some(PipelineStage::Ingest),
            Self::Conversion { stage, .. } => Some(*stage),
            Self::Stream(_) => Some(PipelineStage::Stream),
            Self::Registry(_) | Self::NotFound => None,
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            if let Self::Conversion {
                source: ConverterError::ConversionFailed { stderr: Some(stderr), .. },
                ..
            } = self
            {
                error!(error = %self, stderr = %stderr, "Request failed");
            } else {
                error!(error = %self, "Request failed");
            }
        } else if status != StatusCode::NOT_FOUND {
            warn!(error = %self, "Rejected request");
        }
    }

    /// Renders plain text for inline delivery and JSON for URL delivery.
    /// Not-found responses have an empty body either way.
    pub fn into_response_for(self, mode: DeliveryMode) -> Response {
        self.log();
        let status = self.status();
        if matches!(self, Self::NotFound) {
            return status.into_response();
        }
        match mode {
            DeliveryMode::Inline => (status, self.message()).into_response(),
            DeliveryMode::Url => (
                status,
                Json(ErrorBody {
                    success: false,
                    message: self.message(),
                }),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_for(DeliveryMode::Inline)
    }
}
