//! Shared state handed to every request handler.

use std::sync::Arc;

use maintdesk::{Database, PageQuery, PageWindow, ServerConfig};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Pagination window using the configured page sizes.
    pub fn window(&self, query: &PageQuery) -> PageWindow {
        query.window(self.config.page_size, self.config.max_page_size)
    }

    /// Runs a service call on the blocking pool. Services hold the
    /// connection mutex and do SQLite I/O, so they stay off the async workers.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> maintdesk::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ApiError::internal(format!("Service task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
