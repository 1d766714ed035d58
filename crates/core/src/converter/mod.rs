//! Converter module for transcoding media files.
//!
//! This module provides the `Converter` trait and an implementation that
//! shells out to FFmpeg once per conversion.
//!
//! # Example
//!
//! ```ignore
//! use previewer_core::converter::{ConversionJob, ConversionTarget, Converter, FfmpegConverter};
//!
//! let converter = FfmpegConverter::with_defaults();
//!
//! // Validate ffmpeg is available
//! converter.validate().await?;
//!
//! // Re-encode an upload to H.264/AAC next to the input file
//! let job = ConversionJob::derived("job-1", Path::new("/tmp/upload-1.temp"), ConversionTarget::Intermediate);
//! let result = converter.convert(job).await?;
//! println!("Converted in {} ms", result.duration_ms);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    derive_output_path, ConversionJob, ConversionResult, ConversionTarget, PreviewFormat,
    INTERMEDIATE_EXTENSION,
};
