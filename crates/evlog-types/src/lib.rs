//! Shared record types for evlog.
//!
//! - [`event`]: the ingest payload ([`NewEvent`]) and the stored record ([`Event`])
//! - [`codec`]: JSON text encoding of the nested `messages` / `response` lists
//! - [`error`]: [`CodecError`]

pub mod codec;
pub mod error;
pub mod event;

pub use error::CodecError;
pub use event::{Event, Message, NewEvent, ResponseContent};
