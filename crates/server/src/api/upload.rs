//! `POST /upload`: ingest, convert twice, then deliver the preview.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use previewer_core::{ArtifactSet, DeliveryMode, PipelineOutput, RequestTrace};

use super::error::ApiError;
use super::stream::stream_file;
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Message returned with a URL-mode success.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded and converted successfully.";

/// URL-mode success body.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "previewURL")]
    pub preview_url: String,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mode = state.mode();
    let mut trace = RequestTrace::new(Uuid::new_v4().simple().to_string());

    let (output, artifacts) = match convert_upload(&state, &mut trace, multipart).await {
        Ok(converted) => converted,
        Err(err) => return fail(&mut trace, err, mode),
    };

    match mode {
        // The body owns the trace from here and finishes it
        DeliveryMode::Inline => stream_file(&output.preview, Some(artifacts), Some(trace))
            .await
            .unwrap_or_else(|e| ApiError::Stream(e).into_response_for(mode)),
        DeliveryMode::Url => match publish(&state, &mut trace, output, artifacts).await {
            Ok(response) => response,
            Err(err) => fail(&mut trace, err, mode),
        },
    }
}

fn fail(trace: &mut RequestTrace, err: ApiError, mode: DeliveryMode) -> Response {
    match err.stage() {
        Some(stage) => trace.fail_at(stage),
        None => trace.fail(),
    };
    err.into_response_for(mode)
}

/// Ingests the `file` field and runs both conversions.
async fn convert_upload(
    state: &AppState,
    trace: &mut RequestTrace,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(PipelineOutput, ArtifactSet), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::RequestMalformed(e.body_text()))?;

    // Nothing touches the scratch directory until the file field shows up.
    let (ingested, original_name) = loop {
        let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::RequestMalformed(e.body_text()))?
        else {
            return Err(ApiError::RequestMalformed(format!(
                "no `{}` field in multipart body",
                FILE_FIELD
            )));
        };
        if field.name() == Some(FILE_FIELD) {
            let original_name = field.file_name().map(str::to_string);
            break (state.scratch().ingest(field).await?, original_name);
        }
    };
    let mut artifacts = ArtifactSet::new();
    artifacts.track(&ingested.path);
    trace.advance();
    info!(
        request_id = %trace.request_id(),
        file_name = original_name.as_deref().unwrap_or("-"),
        size_bytes = ingested.size_bytes,
        "Upload received"
    );

    let pipeline = state.pipeline();
    let output = pipeline
        .run(trace, &ingested.path, &mut artifacts)
        .await
        .map_err(|e| ApiError::from_pipeline(e, pipeline.preview_format()))?;

    Ok((output, artifacts))
}

/// Keeps the preview on disk and answers with the path it is served from.
async fn publish(
    state: &AppState,
    trace: &mut RequestTrace,
    output: PipelineOutput,
    mut artifacts: ArtifactSet,
) -> Result<Response, ApiError> {
    // Registered before persisting so a failure still removes the file.
    let name = state.registry().register(&output.preview).await?;
    artifacts.persist(&output.preview);
    // The preview is now reachable under its URL
    trace.advance();
    let removed = artifacts.release();
    trace.advance();

    let preview_url = format!("/stream/{}", name);
    info!(
        request_id = %trace.request_id(),
        preview_url = %preview_url,
        size_bytes = output.preview_size_bytes,
        removed,
        "Preview published"
    );

    Ok(Json(UploadResponse {
        success: true,
        message: UPLOAD_SUCCESS_MESSAGE,
        preview_url,
    })
    .into_response())
}
