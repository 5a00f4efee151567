use thiserror::Error;

/// Errors raised while converting the nested event lists to or from their
/// stored JSON text.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A list could not be serialized.
    #[error("failed to encode {field}: {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored text did not parse back into the expected list shape.
    #[error("failed to decode {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Name of the column the error relates to.
    pub fn field(&self) -> &'static str {
        match self {
            CodecError::Encode { field, .. } | CodecError::Decode { field, .. } => field,
        }
    }
}
