//! Upload conversion pipeline.
//!
//! An ingested upload goes through two conversions, each waiting for the
//! previous one:
//!
//! 1. anything ffmpeg can read → H.264/AAC MP4 (the intermediate artifact)
//! 2. intermediate → preview (animated WebP or WebM)
//!
//! All outputs are named after the upload's temp file, so one request's files
//! share a base name.

mod runner;
mod types;

pub use runner::TranscodePipeline;
pub use types::{PipelineError, PipelineOutput, PipelineStage, RequestState, RequestTrace};
