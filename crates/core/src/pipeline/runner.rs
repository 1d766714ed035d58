//! Two-stage conversion of an ingested upload.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::{PipelineError, PipelineOutput, PipelineStage, RequestTrace};
use crate::converter::{
    ConversionJob, ConversionResult, ConversionTarget, Converter, PreviewFormat,
};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::storage::ArtifactSet;

/// Runs stage 1 (to MP4) then stage 2 (to the preview format).
#[derive(Clone)]
pub struct TranscodePipeline {
    converter: Arc<dyn Converter>,
    preview_format: PreviewFormat,
}

impl TranscodePipeline {
    pub fn new(converter: Arc<dyn Converter>, preview_format: PreviewFormat) -> Self {
        Self {
            converter,
            preview_format,
        }
    }

    pub fn preview_format(&self) -> PreviewFormat {
        self.preview_format
    }

    pub fn converter_name(&self) -> &str {
        self.converter.name()
    }

    /// Converts `input` through both stages.
    ///
    /// `trace` is expected in `Ingested`; it moves to `IntermediateConverted`
    /// and `PreviewConverted` as the stages finish, or to `Failed(stage)`.
    ///
    /// Each output path is added to `artifacts` before its stage starts, so a
    /// half-written file is cleaned up too. Stage 2 only runs once stage 1
    /// has produced its file. The caller owns `artifacts`, so on a stage 2
    /// failure the intermediate file is still on disk when this returns.
    pub async fn run(
        &self,
        trace: &mut RequestTrace,
        input: &Path,
        artifacts: &mut ArtifactSet,
    ) -> Result<PipelineOutput, PipelineError> {
        let intermediate_job = ConversionJob::derived(
            format!("{}-intermediate", trace.request_id()),
            input,
            ConversionTarget::Intermediate,
        );
        artifacts.track(&intermediate_job.output_path);
        let intermediate = self
            .convert_stage(PipelineStage::Intermediate, intermediate_job)
            .await
            .inspect_err(|e| {
                trace.fail_at(e.stage());
            })?;
        trace.advance();

        let preview_job = ConversionJob::derived(
            format!("{}-preview", trace.request_id()),
            &intermediate.output_path,
            ConversionTarget::Preview(self.preview_format),
        );
        artifacts.track(&preview_job.output_path);
        let preview = self
            .convert_stage(PipelineStage::Preview, preview_job)
            .await
            .inspect_err(|e| {
                trace.fail_at(e.stage());
            })?;
        trace.advance();

        Ok(PipelineOutput {
            intermediate: intermediate.output_path,
            preview: preview.output_path,
            preview_format: self.preview_format,
            preview_size_bytes: preview.output_size_bytes,
        })
    }

    async fn convert_stage(
        &self,
        stage: PipelineStage,
        job: ConversionJob,
    ) -> Result<ConversionResult, PipelineError> {
        let job_id = job.job_id.clone();
        let start = Instant::now();
        let result = self.converter.convert(job).await;

        CONVERSION_DURATION
            .with_label_values(&[stage.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(result) => {
                CONVERSIONS_TOTAL
                    .with_label_values(&[stage.as_str(), "success"])
                    .inc();
                info!(
                    job_id = %job_id,
                    %stage,
                    output = %result.output_path.display(),
                    size_bytes = result.output_size_bytes,
                    duration_ms = result.duration_ms,
                    "Conversion finished"
                );
                Ok(result)
            }
            Err(source) => {
                CONVERSIONS_TOTAL
                    .with_label_values(&[stage.as_str(), "failed"])
                    .inc();
                warn!(job_id = %job_id, %stage, error = %source, "Conversion failed");
                Err(PipelineError::Conversion { stage, source })
            }
        }
    }
}
