//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a JSON-body
//! HTTP response of the form `{"error": "..."}`.
//!
//! **Security note:** Internal errors (Database, Codec) are logged
//! with full detail but only a generic message is returned to the caller so
//! that SQL or file paths never leak to clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use evlog_types::CodecError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::db::EncodeError;

pub const INTERNAL_MESSAGE: &str = "internal server error";

/// All errors that can occur in the evlog-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An event list could not be converted to its stored text.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The caller referenced a path that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent a body that does not decode as an event.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the buffering limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Database(_) | ServerError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let client_message = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m)
            | ServerError::BadRequest(m)
            | ServerError::PayloadTooLarge(m) => m.clone(),

            ServerError::Database(e) => {
                error!(error = %e, "database error");
                INTERNAL_MESSAGE.to_owned()
            }
            ServerError::Codec(e) => {
                error!(error = %e, field = e.field(), "event codec error");
                INTERNAL_MESSAGE.to_owned()
            }
        };
        (self.status(), Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<EncodeError> for ServerError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::Codec(e) => ServerError::Codec(e),
            e @ EncodeError::TokenCount { .. } => ServerError::BadRequest(e.to_string()),
        }
    }
}
