#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The job exists but has not reached a terminal state yet.
    #[error("Job {0} is still processing")]
    StillProcessing(String),

    /// The job reached the `failed` state; carries the worker's message.
    #[error("{0}")]
    JobFailed(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
