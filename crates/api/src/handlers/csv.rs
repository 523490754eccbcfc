//! Handlers for CSV upload and processed-file download.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emailflag_core::error::CoreError;
use emailflag_core::jobs::JobStatus;
use emailflag_core::storage::validate_csv_upload;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::background::csv_job;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Response body for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
}

// ── Upload ───────────────────────────────────────────────────────────

/// POST /API/upload
///
/// Accept a multipart upload with a CSV `file` field, register a job and
/// start processing it in the background. Returns the job id without
/// waiting for processing to finish.
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to parse multipart form: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        validate_csv_upload(&filename, field.content_type())?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let job_id = uuid::Uuid::new_v4().to_string();
    state.jobs.create(job_id.clone()).await;

    tracing::info!(
        job_id = %job_id,
        filename = %filename,
        bytes = data.len(),
        "CSV upload accepted",
    );

    csv_job::spawn(
        state.jobs.clone(),
        state.store.clone(),
        job_id.clone(),
        data,
        filename,
    );

    Ok(Json(UploadResponse { id: job_id }))
}

// ── Download ─────────────────────────────────────────────────────────

/// GET /API/download/{id}
///
/// Stream the processed file for a completed job as an attachment.
///
/// - unknown id -> 400
/// - still processing -> 423
/// - failed -> 500 with the job's error message
pub async fn download_csv(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let job = state
        .jobs
        .get(&job_id)
        .await
        .ok_or(AppError::InvalidJobId)?;

    let output_location = match job.status {
        JobStatus::Processing => return Err(CoreError::StillProcessing(job_id).into()),
        JobStatus::Failed { error } => return Err(CoreError::JobFailed(error).into()),
        JobStatus::Completed { output_location } => output_location,
    };

    let path = FsPath::new(&output_location);
    let file = state.store.open_for_read(path).await.map_err(|e| {
        AppError::InternalError(format!(
            "Failed to open processed file {output_location}: {e}"
        ))
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("processed_{job_id}.csv"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, attachment_disposition(&filename)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// `Content-Disposition` value for downloading `filename`.
///
/// Quotes, backslashes and anything outside printable ASCII are replaced with
/// `_` so the value always forms a single well-formed quoted string.
fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
