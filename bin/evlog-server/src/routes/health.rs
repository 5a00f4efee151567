//! Liveness endpoint for evlog-server.
//!
//! `GET /health` answers without touching the event store, so it stays up
//! while SQLite is busy or locked. It reports the crate name and version.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

pub fn router<S: Send + Sync + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new().route("/health", get(get_health))
}

/// `{"status": "ok", "service": "evlog-server", "version": "<crate version>"}`.
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
