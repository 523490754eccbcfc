use std::sync::Arc;

use emailflag_core::jobs::JobRegistry;
use emailflag_core::storage::FileStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job registry shared with the background CSV workers.
    pub jobs: Arc<JobRegistry>,
    /// Storage for uploaded and processed files.
    pub store: Arc<FileStore>,
}

impl AppState {
    /// Build the state for a process: one registry and one file store rooted
    /// at the configured upload directory.
    pub fn new(config: ServerConfig) -> Self {
        let store = FileStore::new(config.upload_dir.clone());
        Self {
            config: Arc::new(config),
            jobs: Arc::new(JobRegistry::new()),
            store: Arc::new(store),
        }
    }
}
