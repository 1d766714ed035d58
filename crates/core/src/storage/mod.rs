//! Scratch storage for uploads and conversion outputs.
//!
//! An upload is copied into a uniquely named file under the configured
//! scratch directory. Every file a request creates is tracked by an
//! [`ArtifactSet`], which deletes them when the request is done with them.

mod error;
mod guard;
mod scratch;

pub use error::StorageError;
pub use guard::{cleanup, ArtifactSet};
pub use scratch::{IngestedFile, ScratchDir, UPLOAD_EXTENSION, UPLOAD_PREFIX};
