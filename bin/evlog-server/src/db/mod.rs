//! Database abstraction layer.
//!
//! [`EventStore`] defines the interface for persisting events. The default
//! implementation is [`sqlite::SqliteStore`]; handlers are generic over the
//! trait so tests can substitute their own store.
//!
//! All trait methods use `impl Future` in their signatures (stable since Rust
//! 1.75) so no extra `async-trait` crate is required.

pub mod sqlite;

use std::future::Future;

use evlog_types::{CodecError, Event, NewEvent, codec};
use thiserror::Error;

/// Why a [`NewEvent`] could not be turned into an [`EventRecord`].
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Token counts are stored in a signed 64-bit column.
    #[error("{field} exceeds the storable range: {value}")]
    TokenCount { field: &'static str, value: u64 },
}

/// A single row ready for insertion into the `events` table.
///
/// The two nested lists are already encoded to JSON text; the store writes
/// them verbatim.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub session_id: String,
    pub messages: String,
    pub response: String,
    pub model: String,
    pub stop_reason: String,
    pub content: String,
    pub kind: String,
    pub role: String,
    pub cache_read_input_tokens: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl EventRecord {
    /// Encode `event`'s nested lists and flatten it into a row.
    pub fn encode(event: NewEvent) -> Result<Self, EncodeError> {
        let messages = codec::encode_messages(&event.messages)?;
        let response = codec::encode_response(&event.response)?;
        Ok(Self {
            session_id: event.session_id,
            messages,
            response,
            model: event.model,
            stop_reason: event.stop_reason,
            content: event.content,
            kind: event.kind,
            role: event.role,
            cache_read_input_tokens: storable(
                "cache_read_input_tokens",
                event.cache_read_input_tokens,
            )?,
            input_tokens: storable("input_tokens", event.input_tokens)?,
            output_tokens: storable("output_tokens", event.output_tokens)?,
        })
    }
}

fn storable(field: &'static str, value: u64) -> Result<i64, EncodeError> {
    i64::try_from(value).map_err(|_| EncodeError::TokenCount { field, value })
}

/// Trait for persisting and listing events.
///
/// Implement this trait to swap SQLite for another backend without touching
/// any handler code.
pub trait EventStore: Send + Sync + 'static {
    /// Append one event. Returns the id assigned to the new row.
    fn insert_event(
        &self,
        record: EventRecord,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;

    /// Every stored event, newest first.
    ///
    /// Rows whose stored text no longer decodes are logged and left out of
    /// the result instead of failing the whole listing.
    fn list_events(&self) -> impl Future<Output = Result<Vec<Event>, sqlx::Error>> + Send;

    /// Release the underlying connections.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
