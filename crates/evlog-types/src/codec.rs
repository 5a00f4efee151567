//! JSON text codec for the nested event lists.
//!
//! `messages` and `response` are stored as one TEXT column each. The text is
//! plain structural JSON, so a stored value reads back exactly as written.
//! Rows written by older deployments may hold the literal `null` for an
//! empty list; that decodes to an empty `Vec`.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::event::{Message, ResponseContent};

pub const MESSAGES_FIELD: &str = "messages";
pub const RESPONSE_FIELD: &str = "response";

pub fn encode_messages(messages: &[Message]) -> Result<String, CodecError> {
    encode(MESSAGES_FIELD, messages)
}

pub fn decode_messages(text: &str) -> Result<Vec<Message>, CodecError> {
    decode(MESSAGES_FIELD, text)
}

pub fn encode_response(response: &[ResponseContent]) -> Result<String, CodecError> {
    encode(RESPONSE_FIELD, response)
}

pub fn decode_response(text: &str) -> Result<Vec<ResponseContent>, CodecError> {
    decode(RESPONSE_FIELD, text)
}

fn encode<T: Serialize>(field: &'static str, items: &[T]) -> Result<String, CodecError> {
    serde_json::to_string(items).map_err(|source| CodecError::Encode { field, source })
}

fn decode<T: DeserializeOwned>(field: &'static str, text: &str) -> Result<Vec<T>, CodecError> {
    serde_json::from_str::<Option<Vec<T>>>(text)
        .map(Option::unwrap_or_default)
        .map_err(|source| CodecError::Decode { field, source })
}
