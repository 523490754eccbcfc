//! Handlers for job status inspection.

use axum::extract::{Path, State};
use axum::Json;
use emailflag_core::error::CoreError;
use emailflag_core::jobs::JobRecord;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /API/jobs/{id}
///
/// Return the current snapshot of a job, whatever its state.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<JobRecord>>> {
    let job = state
        .jobs
        .get(&job_id)
        .await
        .ok_or(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        })?;

    Ok(Json(DataResponse { data: job }))
}
