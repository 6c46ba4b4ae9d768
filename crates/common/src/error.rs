//! Error types for the entity model and wire codec.

use thiserror::Error;

use crate::entity::EdmType;

/// Errors produced while building, parsing, or decoding entities.
///
/// These never carry property *values*; only names and type tags, which are
/// safe to log.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A raw string could not be converted into the requested EDM type.
    #[error("property {property}: value is not a valid {edm_type}")]
    InvalidValue {
        /// Name of the offending property.
        property: String,
        /// Type the value was expected to parse as.
        edm_type: EdmType,
    },

    /// An `@odata.type` annotation named a type this codec does not know.
    #[error("property {property}: unknown type annotation {annotation:?}")]
    UnknownType {
        /// Name of the annotated property.
        property: String,
        /// The annotation as it appeared on the wire.
        annotation: String,
    },

    /// A JSON member had a shape that cannot represent an entity property.
    #[error("property {0}: unsupported JSON value")]
    UnsupportedJson(String),

    /// The payload was not a JSON object, or lacked `PartitionKey`/`RowKey`.
    #[error("malformed entity payload: {0}")]
    MalformedPayload(String),
}

impl ModelError {
    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::InvalidValue { .. } => "invalid_value",
            ModelError::UnknownType { .. } => "unknown_type",
            ModelError::UnsupportedJson(_) => "unsupported_json",
            ModelError::MalformedPayload(_) => "malformed_payload",
        }
    }
}
