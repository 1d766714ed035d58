//! Mock converter for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{
    ConversionJob, ConversionResult, ConversionTarget, Converter, ConverterError,
};
use crate::pipeline::PipelineStage;

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate a failing stage or a missing ffmpeg binary
/// - Panic mid-conversion, or leave a directory where the output belongs
/// - Write real output files so streaming and cleanup can be observed
///
/// Successful conversions copy the input file to the output path, unless
/// fixed output bytes were configured.
///
/// # Example
///
/// ```rust,ignore
/// use previewer_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.fail_at(PipelineStage::Preview).await;
///
/// let err = pipeline.run(&mut trace, &input, &mut artifacts).await.unwrap_err();
///
/// // Only stage 1 ran to completion
/// assert_eq!(converter.successful_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Stage that fails every time it is reached.
    failing_stage: Arc<RwLock<Option<PipelineStage>>>,
    /// Report every conversion as a missing binary.
    missing_tool: Arc<RwLock<bool>>,
    /// Bytes written as output instead of a copy of the input.
    output_bytes: Arc<RwLock<Option<Vec<u8>>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Panic instead of converting.
    panics: Arc<RwLock<bool>>,
    /// Create a directory at the output path instead of a file.
    directory_output: Arc<RwLock<bool>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            failing_stage: Arc::new(RwLock::new(None)),
            missing_tool: Arc::new(RwLock::new(false)),
            output_bytes: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            panics: Arc::new(RwLock::new(false)),
            directory_output: Arc::new(RwLock::new(false)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the submitted jobs, in order.
    pub async fn recorded_jobs(&self) -> Vec<ConversionJob> {
        self.conversions
            .read()
            .await
            .iter()
            .map(|c| c.job.clone())
            .collect()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Get the number of conversions that succeeded.
    pub async fn successful_count(&self) -> usize {
        self.conversions
            .read()
            .await
            .iter()
            .filter(|c| c.success)
            .count()
    }

    /// Make every conversion for `stage` fail.
    pub async fn fail_at(&self, stage: PipelineStage) {
        *self.failing_stage.write().await = Some(stage);
    }

    /// Make every conversion fail as if ffmpeg were not installed.
    pub async fn simulate_missing_tool(&self) {
        *self.missing_tool.write().await = true;
    }

    /// Write `bytes` as the output of every conversion.
    pub async fn set_output_bytes(&self, bytes: Vec<u8>) {
        *self.output_bytes.write().await = Some(bytes);
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Make every conversion panic.
    pub async fn simulate_panic(&self) {
        *self.panics.write().await = true;
    }

    /// Make every conversion leave a directory at its output path.
    pub async fn produce_directories(&self) {
        *self.directory_output.write().await = true;
    }

    fn stage_of(target: &ConversionTarget) -> PipelineStage {
        match target {
            ConversionTarget::Intermediate => PipelineStage::Intermediate,
            ConversionTarget::Preview(_) => PipelineStage::Preview,
        }
    }

    async fn record(&self, job: ConversionJob, success: bool) {
        self.conversions
            .write()
            .await
            .push(RecordedConversion { job, success });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        if *self.panics.read().await {
            panic!("mock converter panicked on {}", job.job_id);
        }

        if *self.missing_tool.read().await {
            self.record(job, false).await;
            return Err(ConverterError::FfmpegNotFound {
                path: PathBuf::from("ffmpeg"),
            });
        }

        if *self.failing_stage.read().await == Some(Self::stage_of(&job.target)) {
            self.record(job, false).await;
            return Err(ConverterError::conversion_failed(
                "FFmpeg exited with code: Some(1)",
                Some("mock failure".to_string()),
            ));
        }

        if tokio::fs::metadata(&job.input_path).await.is_err() {
            let path = job.input_path.clone();
            self.record(job, false).await;
            return Err(ConverterError::InputNotFound { path });
        }

        // Simulate conversion time
        let duration_ms = *self.conversion_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let fixed_output = self.output_bytes.read().await.clone();
        if *self.directory_output.read().await {
            tokio::fs::create_dir_all(&job.output_path).await?;
        } else {
            match fixed_output {
                Some(bytes) => tokio::fs::write(&job.output_path, bytes).await?,
                None => {
                    tokio::fs::copy(&job.input_path, &job.output_path).await?;
                }
            }
        }
        let output_size_bytes = tokio::fs::metadata(&job.output_path).await?.len();

        self.record(job.clone(), true).await;

        Ok(ConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes,
            duration_ms,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if *self.missing_tool.read().await {
            return Err(ConverterError::FfmpegNotFound {
                path: PathBuf::from("ffmpeg"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::PreviewFormat;

    #[tokio::test]
    async fn test_copies_input_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("upload-1.temp");
        std::fs::write(&input, b"frames").unwrap();

        let converter = MockConverter::new();
        let result = converter
            .convert(ConversionJob::derived("j", &input, ConversionTarget::Intermediate))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&result.output_path).unwrap(), b"frames");
        assert_eq!(result.output_size_bytes, 6);
        assert_eq!(converter.successful_count().await, 1);
    }

    #[tokio::test]
    async fn test_fixed_output_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("upload-1.mp4");
        std::fs::write(&input, b"frames").unwrap();

        let converter = MockConverter::new();
        converter.set_output_bytes(b"RIFF....WEBP".to_vec()).await;
        let result = converter
            .convert(ConversionJob::derived(
                "j",
                &input,
                ConversionTarget::Preview(PreviewFormat::WebP),
            ))
            .await
            .unwrap();

        assert_eq!(std::fs::read(result.output_path).unwrap(), b"RIFF....WEBP");
    }

    #[tokio::test]
    async fn test_failing_stage_records_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("upload-1.temp");
        std::fs::write(&input, b"frames").unwrap();

        let converter = MockConverter::new();
        converter.fail_at(PipelineStage::Intermediate).await;
        let job = ConversionJob::derived("j", &input, ConversionTarget::Intermediate);
        let output = job.output_path.clone();

        assert!(converter.convert(job).await.is_err());
        assert!(!output.exists());
        assert_eq!(converter.conversion_count().await, 1);
        assert_eq!(converter.successful_count().await, 0);
    }

    #[tokio::test]
    async fn test_directory_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("upload-1.temp");
        std::fs::write(&input, b"frames").unwrap();

        let converter = MockConverter::new();
        converter.produce_directories().await;
        let result = converter
            .convert(ConversionJob::derived("j", &input, ConversionTarget::Intermediate))
            .await
            .unwrap();

        assert!(result.output_path.is_dir());
    }

    #[tokio::test]
    #[should_panic(expected = "mock converter panicked")]
    async fn test_simulated_panic() {
        let converter = MockConverter::new();
        converter.simulate_panic().await;
        let _ = converter
            .convert(ConversionJob::derived(
                "j",
                std::path::Path::new("/nonexistent/upload-1.temp"),
                ConversionTarget::Intermediate,
            ))
            .await;
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let converter = MockConverter::new();
        converter.simulate_missing_tool().await;
        let err = converter.validate().await.unwrap_err();
        assert!(err.is_tool_unavailable());
    }
}
