//! Route definitions for CSV upload and download.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::csv;
use crate::state::AppState;

/// Routes merged into `/API`.
///
/// ```text
/// POST   /upload            -> upload_csv
/// GET    /download/{id}     -> download_csv
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(csv::upload_csv))
        .route("/download/{id}", get(csv::download_csv))
}
