pub mod csv;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/API` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload                 upload a CSV file (POST)
/// /download/{id}          download the processed file (GET)
/// /jobs/{id}              job status snapshot (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(csv::router()).nest("/jobs", jobs::router())
}
