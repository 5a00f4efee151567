//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::db::sqlite::SqliteStore;

/// State shared across all HTTP handlers.
///
/// Generic over the event store so tests can inject their own; the server
/// binary uses [`SqliteStore`].
#[derive(Debug)]
pub struct AppState<S = SqliteStore> {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent event store.
    pub store: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}
