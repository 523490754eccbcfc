//! In-memory job registry.
//!
//! A job is created in [`JobStatus::Processing`] by the upload path, moved to
//! a terminal state exactly once by its background worker, and read any
//! number of times by the download path. Records are never removed.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::types::{JobId, Timestamp};

/// Lifecycle state of a job.
///
/// The output location only exists on `Completed` and the error message only
/// on `Failed`, so the two can never be set at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed { output_location: String },
    Failed { error: String },
}

impl JobStatus {
    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    /// Lowercase status label, as used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed { .. } => "completed",
            JobStatus::Failed { .. } => "failed",
        }
    }
}

/// Snapshot of a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    #[serde(flatten)]
    pub status: JobStatus,
    pub created_at: Timestamp,
}

/// Thread-safe map from job id to job record.
///
/// Interior `RwLock`; designed to be wrapped in `Arc` and shared between
/// request handlers and background workers. Every method takes and releases
/// the lock within the call and hands back owned data, so callers never hold
/// it across file I/O.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh `Processing` record for `id`.
    ///
    /// An existing record with the same id is silently replaced.
    pub async fn create(&self, id: impl Into<JobId>) -> JobRecord {
        let record = JobRecord {
            id: id.into(),
            status: JobStatus::Processing,
            created_at: chrono::Utc::now(),
        };
        self.jobs
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        record
    }

    /// Return a snapshot of the record for `id`, if any.
    pub async fn get(&self, id: &str) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Move the job `id` to `status`.
    ///
    /// Unknown ids are ignored. An empty `output_location` or `error` never
    /// overwrites a non-empty value already stored on a record in the same
    /// state.
    pub async fn update(&self, id: &str, status: JobStatus) {
        let mut jobs = self.jobs.write().await;
        let Some(record) = jobs.get_mut(id) else {
            tracing::debug!(job_id = %id, status = status.as_str(), "Update for unknown job ignored");
            return;
        };

        record.status = match (status, &record.status) {
            (
                JobStatus::Completed { output_location },
                JobStatus::Completed {
                    output_location: previous,
                },
            ) if output_location.is_empty() => JobStatus::Completed {
                output_location: previous.clone(),
            },
            (JobStatus::Failed { error }, JobStatus::Failed { error: previous })
                if error.is_empty() =>
            {
                JobStatus::Failed {
                    error: previous.clone(),
                }
            }
            (next, _) => next,
        };
    }

    /// Number of jobs tracked since startup.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
