pub mod events;

use axum::Router;
use std::sync::Arc;

use crate::db::EventStore;
use crate::state::AppState;

/// Routes nested under `/api`.
pub fn router<S: EventStore>() -> Router<Arc<AppState<S>>> {
    Router::new().merge(events::router::<S>())
}
