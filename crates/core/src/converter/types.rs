//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of the stage 1 output.
pub const INTERMEDIATE_EXTENSION: &str = "mp4";

/// Lightweight format produced by the second conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreviewFormat {
    /// Animated WebP image
    #[serde(rename = "webp")]
    WebP,
    /// VP8/Vorbis WebM video
    #[serde(rename = "webm")]
    WebM,
}

impl PreviewFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP => "webp",
            Self::WebM => "webm",
        }
    }

    /// Human-readable name, used in client-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WebP => "WebP",
            Self::WebM => "WebM",
        }
    }

    /// Returns the ffmpeg video codec for this format.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::WebP => "libwebp",
            Self::WebM => "libvpx",
        }
    }
}

/// What a single ffmpeg invocation should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "format", rename_all = "snake_case")]
pub enum ConversionTarget {
    /// H.264 video and AAC audio in an MP4 container.
    Intermediate,
    /// Preview rendition of the intermediate file.
    Preview(PreviewFormat),
}

impl ConversionTarget {
    /// Returns the file extension of the produced file.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Intermediate => INTERMEDIATE_EXTENSION,
            Self::Preview(format) => format.extension(),
        }
    }

    /// Metric label for this target.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Intermediate => "intermediate",
            Self::Preview(_) => "preview",
        }
    }
}

/// A single ffmpeg invocation to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Identifier used in logs.
    pub job_id: String,
    /// Path to the input file.
    pub input_path: PathBuf,
    /// Path for the output file.
    pub output_path: PathBuf,
    /// What to produce.
    pub target: ConversionTarget,
}

impl ConversionJob {
    /// Creates a job whose output sits next to `input_path`, named after it
    /// with the target's extension.
    pub fn derived(job_id: impl Into<String>, input_path: &Path, target: ConversionTarget) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.to_path_buf(),
            output_path: derive_output_path(input_path, target.extension()),
            target,
        }
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job identifier.
    pub job_id: String,
    /// Path to the output file.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Wall time spent in the conversion, including waiting for a slot.
    pub duration_ms: u64,
}

/// Replaces the extension of `input` with `extension`.
///
/// `/tmp/upload-1234.temp` with `mp4` becomes `/tmp/upload-1234.mp4`.
pub fn derive_output_path(input: &Path, extension: &str) -> PathBuf {
    input.with_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path_replaces_suffix() {
        let out = derive_output_path(Path::new("/scratch/upload-abc.temp"), "mp4");
        assert_eq!(out, PathBuf::from("/scratch/upload-abc.mp4"));
    }

    #[test]
    fn test_derive_output_path_without_suffix() {
        let out = derive_output_path(Path::new("/scratch/upload-abc"), "webm");
        assert_eq!(out, PathBuf::from("/scratch/upload-abc.webm"));
    }

    #[test]
    fn test_derived_job_paths() {
        let job = ConversionJob::derived(
            "job-1",
            Path::new("/scratch/upload-abc.mp4"),
            ConversionTarget::Preview(PreviewFormat::WebP),
        );
        assert_eq!(job.output_path, PathBuf::from("/scratch/upload-abc.webp"));
        assert_eq!(job.target.label(), "preview");
    }

    #[test]
    fn test_preview_format_serde_names() {
        let json = serde_json::to_string(&PreviewFormat::WebM).unwrap();
        assert_eq!(json, "\"webm\"");
        let parsed: PreviewFormat = serde_json::from_str("\"webp\"").unwrap();
        assert_eq!(parsed, PreviewFormat::WebP);
    }
}
