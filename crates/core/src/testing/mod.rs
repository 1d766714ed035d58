//! Testing utilities and mock implementations.
//!
//! This module provides a mock implementation of the [`Converter`] trait so
//! the pipeline and HTTP layer can be exercised without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use previewer_core::testing::MockConverter;
//!
//! let converter = Arc::new(MockConverter::new());
//! let pipeline = TranscodePipeline::new(converter.clone(), PreviewFormat::WebP);
//!
//! // Use in AppState...
//! ```
//!
//! [`Converter`]: crate::converter::Converter

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};
