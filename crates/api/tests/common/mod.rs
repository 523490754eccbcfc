#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use emailflag_api::config::ServerConfig;
use emailflag_api::router::build_app_router;
use emailflag_api::state::AppState;
use emailflag_core::jobs::JobStatus;

/// Multipart boundary used by [`multipart_upload`].
const BOUNDARY: &str = "emailflag-test-boundary";

/// Build a test `ServerConfig` with safe defaults, storing files under
/// `upload_dir`.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 10 * 1024 * 1024,
    }
}

/// Build the full application router (same middleware stack as `main.rs`)
/// and return it together with its state so tests can inspect the job
/// registry directly.
pub fn build_test_app(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    (build_app_router(state.clone()), state)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Build a `multipart/form-data` POST with a single file field.
pub fn multipart_upload(
    uri: &str,
    field_name: &str,
    filename: &str,
    content_type: &str,
    contents: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Send a multipart upload to `/API/upload`.
pub async fn upload(
    app: Router,
    filename: &str,
    content_type: &str,
    contents: &[u8],
) -> Response<Body> {
    let request = multipart_upload("/API/upload", "file", filename, content_type, contents);
    app.oneshot(request).await.unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the registry until the job leaves the `processing` state.
pub async fn wait_for_terminal(state: &AppState, job_id: &str) -> JobStatus {
    for _ in 0..500 {
        if let Some(job) = state.jobs.get(job_id).await {
            if job.status.is_terminal() {
                return job.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}
