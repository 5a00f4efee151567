//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID span)
//! - Health / heartbeat route
//! - Event routes under `/api/v1`
//! - A JSON 404 fallback, registered before the layers so preflights to
//!   unknown paths are still answered by CORS

mod health;
mod v1;

use axum::http::Uri;
use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::db::EventStore;
use crate::error::ServerError;
use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build<S: EventStore>(state: Arc<AppState<S>>) -> Router {
    let cors = cors::cors_layer(&state.config);
    let [allow_methods, allow_headers] = cors::allow_lists_on_every_response();

    Router::new()
        .merge(health::router::<S>())
        .nest("/api", v1::router::<S>())
        .fallback(not_found)
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(allow_methods)
                .layer(allow_headers),
        )
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

async fn not_found(uri: Uri) -> ServerError {
    ServerError::NotFound(format!("no route for {}", uri.path()))
}
