//! Error types for scratch storage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving an upload into scratch storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The scratch directory or temp file could not be created.
    #[error("Failed to create temporary file in {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing upload bytes to the temp file failed.
    #[error("Failed to write temporary file {path}: {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload body itself could not be read.
    #[error("Failed to read upload stream: {reason}")]
    UploadStream { reason: String },
}

impl StorageError {
    /// Whether the client, rather than the host, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UploadStream { .. })
    }
}
