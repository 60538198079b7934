use std::sync::Arc;

use tracing::error;
use warbler_db::Database;

use crate::error::ApiError;
use crate::session::SessionConfig;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session: SessionConfig,
}

impl AppStateInner {
    pub fn new(db: Database, session: SessionConfig) -> AppState {
        Arc::new(Self { db, session })
    }
}

/// Run a blocking store call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> warbler_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
