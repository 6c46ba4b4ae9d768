//! Errors surfaced by the encrypt and decrypt paths.
//!
//! Every variant is deterministic: retrying the same call with the same inputs
//! produces the same error, so nothing here is retried.

use common::ModelError;
use thiserror::Error;

use crate::crypto::CipherError;

/// Top-level error type for [`crate::policy::EncryptionPolicy`].
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// A selected property is not a string, or is null.
    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    /// No key-encryption key or key resolver is configured.
    #[error("missing encryption policy: {0}")]
    MissingPolicy(String),

    /// The resolved key does not match the wrapped content key, no key was
    /// found for its id, or the unwrap integrity check failed.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// A property or the manifest failed to decrypt: tampered data, data
    /// copied from another entity, or a wrong content key.
    #[error("decryption failed: {context}")]
    DecryptionFailed {
        context: String,
        #[source]
        source: CipherError,
    },

    /// Strict mode is on and the entity carries no encryption metadata.
    #[error("encryption is required but the entity carries no encryption metadata")]
    EncryptionRequired,

    /// The entity uses a property name reserved for encryption metadata.
    #[error("property name {0} is reserved for encryption metadata")]
    ReservedPropertyName(String),

    /// The encryption metadata is malformed or names an unsupported agent.
    #[error("invalid encryption metadata: {0}")]
    InvalidMetadata(String),

    /// A decrypted value does not parse as the type the resolver asked for.
    #[error("decrypted property could not be restored: {0}")]
    InvalidPropertyValue(#[from] ModelError),

    /// The key-encryption key has a length the wrap algorithm cannot use.
    #[error("key {key_id}: unsupported key length {actual} bytes")]
    InvalidKeyLength { key_id: String, actual: usize },

    /// A cipher primitive failed on the write path.
    #[error("encryption failed: {0}")]
    EncryptionFailed(#[from] CipherError),
}

impl EncryptionError {
    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EncryptionError::InvalidOperand(_) => "invalid_operand",
            EncryptionError::MissingPolicy(_) => "missing_policy",
            EncryptionError::KeyMismatch(_) => "key_mismatch",
            EncryptionError::DecryptionFailed { .. } => "decryption_failed",
            EncryptionError::EncryptionRequired => "encryption_required",
            EncryptionError::ReservedPropertyName(_) => "reserved_property_name",
            EncryptionError::InvalidMetadata(_) => "invalid_metadata",
            EncryptionError::InvalidPropertyValue(_) => "invalid_property_value",
            EncryptionError::InvalidKeyLength { .. } => "invalid_key_length",
            EncryptionError::EncryptionFailed(_) => "encryption_failed",
        }
    }

    /// Returns `true` for failures that indicate wrong keys or altered data.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            EncryptionError::KeyMismatch(_) | EncryptionError::DecryptionFailed { .. }
        )
    }

    pub(crate) fn decryption(context: impl Into<String>, source: CipherError) -> Self {
        EncryptionError::DecryptionFailed {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn codes() {
        assert_eq!(EncryptionError::InvalidOperand("x".into()).code(), "invalid_operand");
        assert_eq!(EncryptionError::MissingPolicy("x".into()).code(), "missing_policy");
        assert_eq!(EncryptionError::KeyMismatch("x".into()).code(), "key_mismatch");
        assert_eq!(EncryptionError::EncryptionRequired.code(), "encryption_required");
        assert_eq!(
            EncryptionError::decryption("manifest", CipherError::Padding).code(),
            "decryption_failed"
        );
    }

    #[test]
    fn decryption_failure_keeps_cipher_cause() {
        let e = EncryptionError::decryption("property ssn", CipherError::Padding);
        assert!(e.to_string().contains("property ssn"));
        let source = e.source().expect("source attached");
        assert!(source.to_string().contains("padding"));
        assert!(e.is_authentication_failure());
    }

    #[test]
    fn strict_and_operand_errors_are_not_authentication_failures() {
        assert!(!EncryptionError::EncryptionRequired.is_authentication_failure());
        assert!(!EncryptionError::InvalidOperand("x".into()).is_authentication_failure());
    }
}
