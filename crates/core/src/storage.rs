//! Local file storage for uploaded and processed CSV documents.
//!
//! Every job gets two locations under the store root: the raw upload and the
//! processed output. Both are derived from the job id, so concurrent jobs
//! never share a file.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Default root directory for uploads and processed files.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Filename used when the client did not supply a usable one.
const FALLBACK_FILENAME: &str = "upload.csv";

/// Content type that marks an upload as CSV.
const CSV_CONTENT_TYPE: &str = "text/csv";

// ---------------------------------------------------------------------------
// Upload validation
// ---------------------------------------------------------------------------

/// Accept an upload if its content type mentions `text/csv` or its filename
/// ends in `.csv` (case-insensitive).
pub fn validate_csv_upload(filename: &str, content_type: Option<&str>) -> Result<(), CoreError> {
    let csv_content = content_type.is_some_and(|ct| ct.contains(CSV_CONTENT_TYPE));
    let csv_name = filename.to_ascii_lowercase().ends_with(".csv");

    if csv_content || csv_name {
        Ok(())
    } else {
        Err(CoreError::Validation("File must be a CSV file".into()))
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// Both `/` and `\` are treated as separators. Empty results, `.` and `..`
/// fall back to `upload.csv`.
pub fn sanitize_filename(filename: &str) -> &str {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => FALLBACK_FILENAME,
        _ => base,
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Filesystem-backed byte storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the raw upload for `job_id`: `<root>/upload_<id>_<name>`.
    pub fn upload_location(&self, job_id: &str, filename: &str) -> PathBuf {
        self.root
            .join(format!("upload_{job_id}_{}", sanitize_filename(filename)))
    }

    /// Location of the processed output for `job_id`: `<root>/processed_<id>.csv`.
    pub fn output_location(&self, job_id: &str) -> PathBuf {
        self.root.join(format!("processed_{job_id}.csv"))
    }

    /// Write `bytes` to `location`, creating the store root if needed.
    pub async fn write(&self, location: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(location, bytes).await
    }

    /// Open `location` for async reading.
    pub async fn open_for_read(&self, location: &Path) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(location).await
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_DIR)
    }
}
