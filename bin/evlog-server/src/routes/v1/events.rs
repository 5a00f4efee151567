//! Event ingest and listing.
//!
//! - `POST /api/v1`: decode a [`NewEvent`], store it, answer 200 with no body.
//! - `GET /api/v1/events`: every stored event, newest first.
//!
//! Any other method on these paths is rejected by the router with 405.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use evlog_types::{Event, NewEvent};
use tracing::{info, warn};

use crate::db::{EventRecord, EventStore};
use crate::error::ServerError;
use crate::state::AppState;

/// Register event routes.
pub fn router<S: EventStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/v1", post(ingest_event::<S>))
        .route("/v1/events", get(list_events::<S>))
}

/// Store one event.
///
/// The body is read raw and decoded here rather than through `Json`, so a
/// missing `Content-Type` is accepted and every decode failure (syntax or
/// type mismatch) is a 400 carrying the decoder's message.
pub async fn ingest_event<S: EventStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<StatusCode, ServerError> {
    let event: NewEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "failed to decode event body");
        ServerError::from(e)
    })?;

    info!(
        session_id = %event.session_id,
        model = %event.model,
        messages = event.messages.len(),
        response_blocks = event.response.len(),
        "event received"
    );

    let record = EventRecord::encode(event)?;
    let id = state.store.insert_event(record).await?;

    info!(event_id = id, "event stored");
    Ok(StatusCode::OK)
}

/// List all events, newest first.
pub async fn list_events<S: EventStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Event>>, ServerError> {
    let events = state.store.list_events().await?;
    info!(count = events.len(), "events listed");
    Ok(Json(events))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
