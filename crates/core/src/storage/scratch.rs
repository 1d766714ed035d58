//! Uniquely named upload files inside a configured scratch directory.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use super::error::StorageError;
use super::guard::cleanup;
use crate::metrics::BYTES_INGESTED;

/// Prefix of every upload file name.
pub const UPLOAD_PREFIX: &str = "upload-";
/// Extension of the raw upload copy.
pub const UPLOAD_EXTENSION: &str = "temp";

/// An upload copied to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// Path of the temp file, closed for writing.
    pub path: PathBuf,
    /// Number of bytes written.
    pub size_bytes: u64,
}

/// Scratch directory for request-scoped files.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Creates a handle on `root`. Nothing is touched until [`ScratchDir::ensure`]
    /// or an ingest call.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The scratch root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the scratch root if it is missing.
    pub async fn ensure(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::CreateFailed {
                path: self.root.clone(),
                source,
            })
    }

    fn unique_path(&self) -> PathBuf {
        self.root.join(format!(
            "{}{}.{}",
            UPLOAD_PREFIX,
            Uuid::new_v4().simple(),
            UPLOAD_EXTENSION
        ))
    }

    /// Opens a fresh file that did not exist before.
    async fn create(&self) -> Result<(PathBuf, File), StorageError> {
        self.ensure().await?;
        let path = self.unique_path();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| StorageError::CreateFailed {
                path: path.clone(),
                source,
            })?;
        Ok((path, file))
    }

    /// Copies every chunk of `stream` into a new temp file.
    ///
    /// The file is flushed and closed before this returns. On failure the
    /// partial file is removed.
    pub async fn ingest<S, E>(&self, stream: S) -> Result<IngestedFile, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let (path, mut file) = self.create().await?;
        let mut stream = std::pin::pin!(stream);
        let mut size_bytes = 0u64;

        let copied: Result<(), StorageError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| StorageError::UploadStream {
                    reason: e.to_string(),
                })?;
                file.write_all(&chunk)
                    .await
                    .map_err(|source| StorageError::CopyFailed {
                        path: path.clone(),
                        source,
                    })?;
                size_bytes += chunk.len() as u64;
            }
            file.flush().await.map_err(|source| StorageError::CopyFailed {
                path: path.clone(),
                source,
            })?;
            file.sync_all().await.map_err(|source| StorageError::CopyFailed {
                path: path.clone(),
                source,
            })
        }
        .await;
        drop(file);

        if let Err(e) = copied {
            cleanup(std::slice::from_ref(&path));
            return Err(e);
        }

        BYTES_INGESTED.inc_by(size_bytes);
        debug!(path = %path.display(), size_bytes, "Upload stored");
        Ok(IngestedFile { path, size_bytes })
    }

    /// Same as [`ScratchDir::ingest`] for a plain reader.
    pub async fn ingest_reader<R>(&self, reader: R) -> Result<IngestedFile, StorageError>
    where
        R: AsyncRead,
    {
        self.ingest(ReaderStream::new(reader)).await
    }
}
