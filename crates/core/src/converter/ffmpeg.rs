//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionResult, ConversionTarget, PreviewFormat};

/// Number of trailing stderr lines kept for diagnostics.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based converter implementation.
///
/// Every invocation first takes a slot from a semaphore sized by
/// `max_parallel_conversions`, so a burst of uploads queues up instead of
/// forking an unbounded number of encoders.
pub struct FfmpegConverter {
    config: ConverterConfig,
    slots: Arc<Semaphore>,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_parallel_conversions.max(1)));
        Self { config, slots }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Number of conversions that could start right now.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Builds the full ffmpeg argument list for a job.
    fn build_args(&self, job: &ConversionJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ];

        match job.target {
            ConversionTarget::Intermediate => args.extend(Self::intermediate_codec_args()),
            ConversionTarget::Preview(format) => args.extend(Self::preview_codec_args(format)),
        }

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Re-encode video to H.264 and audio to AAC.
    fn intermediate_codec_args() -> Vec<String> {
        ["-c:v", "libx264", "-c:a", "aac", "-strict", "-2"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Codec and speed/quality flags for the preview rendition.
    fn preview_codec_args(format: PreviewFormat) -> Vec<String> {
        let flags: &[&str] = match format {
            // Animated, looping, silent image
            PreviewFormat::WebP => &[
                "-loop",
                "0",
                "-an",
                "-quality",
                "75",
                "-compression_level",
                "4",
            ],
            // Realtime deadline trades size for encode speed
            PreviewFormat::WebM => &[
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-crf",
                "30",
                "-b:v",
                "1M",
                "-c:a",
                "libvorbis",
            ],
        };

        let mut args = vec!["-c:v".to_string(), format.ffmpeg_codec().to_string()];
        args.extend(flags.iter().map(|s| s.to_string()));
        args
    }

    /// Runs ffmpeg for one job and waits for it to exit.
    async fn run_conversion(&self, job: &ConversionJob) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        if tokio::fs::metadata(&job.input_path).await.is_err() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| ConverterError::conversion_failed("Converter is shut down", None))?;

        let args = self.build_args(job);
        debug!(job_id = %job.job_id, ?args, "Starting ffmpeg");

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(job_id = %job.job_id, "ffmpeg timed out, killing process");
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = stderr_tail(&output.stderr);
            warn!(
                job_id = %job.job_id,
                code = ?output.status.code(),
                stderr = %stderr,
                "ffmpeg failed"
            );
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Last few lines of ffmpeg's stderr, lossily decoded.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::conversion_failed(
                "ffmpeg -version failed",
                Some(stderr_tail(&output.stderr)),
            ));
        }

        Ok(())
    }
}
