//! The encrypted-property manifest stored in the second metadata property.
//!
//! The manifest is the sorted JSON array of encrypted property names,
//! encrypted with the entity's content key under an IV derived from the
//! entity's partition and row key. Reading it back under a different identity
//! garbles its first block, which breaks the JSON framing (or, for manifests
//! that fit in one block, the padding). This is what stops encrypted
//! properties and metadata from being copied from one entity onto another.

use std::collections::BTreeSet;

use crate::crypto::{cipher, CipherError, IvScheme};
use crate::error::EncryptionError;
use crate::keys::ContentKey;

/// Encrypt the sorted, de-duplicated list of `names` for the entity
/// (`partition_key`, `row_key`).
///
/// # Errors
///
/// Returns [`EncryptionError::EncryptionFailed`] if the cipher rejects the key.
pub fn build_manifest<'a>(
    names: impl IntoIterator<Item = &'a str>,
    partition_key: &str,
    row_key: &str,
    cek: &ContentKey,
    scheme: &IvScheme,
) -> Result<Vec<u8>, EncryptionError> {
    let sorted: BTreeSet<&str> = names.into_iter().collect();
    let json = serde_json::to_vec(&sorted)
        .map_err(|e| EncryptionError::InvalidMetadata(format!("failed to serialise manifest: {e}")))?;
    let iv = scheme.manifest_iv(partition_key, row_key);
    Ok(cipher::encrypt_property(&json, cek.as_bytes(), &iv)?)
}

/// Decrypt a manifest produced by [`build_manifest`] and return its names.
///
/// # Errors
///
/// Returns [`EncryptionError::DecryptionFailed`] on any failure: bad padding,
/// a plaintext that is not a JSON array of strings, or a truncated input.
pub fn validate_manifest(
    bytes: &[u8],
    partition_key: &str,
    row_key: &str,
    cek: &ContentKey,
    scheme: &IvScheme,
) -> Result<Vec<String>, EncryptionError> {
    let iv = scheme.manifest_iv(partition_key, row_key);
    let plaintext = cipher::decrypt_property(bytes, cek.as_bytes(), &iv)
        .map_err(|source| EncryptionError::decryption("encrypted property manifest", source))?;
    serde_json::from_slice::<Vec<String>>(&plaintext).map_err(|_| {
        EncryptionError::decryption(
            "encrypted property manifest",
            CipherError::MalformedPlaintext,
        )
    })
}
