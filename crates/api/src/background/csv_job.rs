//! Fire-and-forget processing of one uploaded CSV file.
//!
//! The upload handler creates the job record, then hands the raw bytes to
//! [`spawn`] and returns immediately. The task stores the upload, runs the
//! row transformer on a blocking thread and records the terminal state on
//! the job. Failures never reach the original caller; they are written to the
//! job and surfaced when the download is attempted.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use emailflag_core::jobs::{JobRegistry, JobStatus};
use emailflag_core::storage::FileStore;
use emailflag_core::transform::{transform_file, TransformError, TransformSummary};
use emailflag_core::types::JobId;

/// Why a CSV job ended in the `failed` state. The rendered message is stored
/// on the job as-is.
#[derive(Debug, thiserror::Error)]
pub enum CsvJobError {
    #[error("Failed to save uploaded file: {0}")]
    Save(#[from] std::io::Error),

    #[error("Failed to process CSV: {0}")]
    Transform(#[from] TransformError),

    #[error("Failed to process CSV: worker aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Spawn the processing task for `job_id` and detach it.
///
/// The job must already exist in `jobs` in the `processing` state.
pub fn spawn(
    jobs: Arc<JobRegistry>,
    store: Arc<FileStore>,
    job_id: JobId,
    data: Bytes,
    filename: String,
) {
    tokio::spawn(run(jobs, store, job_id, data, filename));
}

/// Process one upload to completion and record the outcome on the job.
pub async fn run(
    jobs: Arc<JobRegistry>,
    store: Arc<FileStore>,
    job_id: JobId,
    data: Bytes,
    filename: String,
) {
    let status = match process(&store, &job_id, &data, &filename).await {
        Ok((output, summary)) => {
            tracing::info!(
                job_id = %job_id,
                output = %output.display(),
                rows_written = summary.rows_written,
                rows_with_email = summary.rows_with_email,
                "CSV job completed",
            );
            JobStatus::Completed {
                output_location: output.to_string_lossy().into_owned(),
            }
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "CSV job failed");
            JobStatus::Failed {
                error: e.to_string(),
            }
        }
    };

    jobs.update(&job_id, status).await;
}

async fn process(
    store: &FileStore,
    job_id: &str,
    data: &[u8],
    filename: &str,
) -> Result<(PathBuf, TransformSummary), CsvJobError> {
    let input = store.upload_location(job_id, filename);
    store.write(&input, data).await?;

    let output = store.output_location(job_id);
    let destination = output.clone();
    let summary =
        tokio::task::spawn_blocking(move || transform_file(&input, &destination)).await??;

    Ok((output, summary))
}
