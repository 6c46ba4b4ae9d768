//! Initialisation-vector derivation for properties and the manifest.
//!
//! Every derived IV is the first 16 bytes of SHA-256 over a sequence of
//! inputs. Which inputs depends on the scheme, and the scheme is inferred from
//! the shape of the stored metadata, never from a version number:
//!
//! | scheme          | metadata shape                        | property IV input       |
//! |-----------------|---------------------------------------|-------------------------|
//! | `Current`       | `ContentEncryptionIV` + wrapping meta | civ, pk, rk, name       |
//! | `SharedIv`      | `ContentEncryptionIV` only            | civ ‖ name              |
//! | `Deterministic` | no `ContentEncryptionIV`              | pk ‖ rk ‖ name          |
//!
//! `Current` frames each input with its length as a little-endian `u32`, so
//! `("tenant", "a-1")` and `("tenanta", "-1")` hash differently. The legacy
//! schemes hash the raw concatenation.
//!
//! The manifest IV always mixes in the partition and row key, followed by the
//! reserved manifest property name.
//!
//! Only `Current` is ever written. The two legacy schemes exist so that data
//! from older and cross-platform writers keeps decrypting; their byte layout
//! must not change.

use common::protocol::{EncryptionData, METADATA2};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use super::cipher::IV_LEN;
use crate::error::EncryptionError;

/// IV derivation scheme for one encrypted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvScheme {
    /// Random per-entity IV, salted per property with the entity identity.
    Current([u8; IV_LEN]),
    /// Legacy: per-entity IV salted with the property name only.
    SharedIv([u8; IV_LEN]),
    /// Legacy / cross-platform: no stored IV; derived from identity alone.
    Deterministic,
}

impl IvScheme {
    /// Fresh scheme for a new write, with a random content IV from the OS CSPRNG.
    pub fn random() -> Self {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        IvScheme::Current(iv)
    }

    /// Infer the scheme from stored metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidMetadata`] if a `ContentEncryptionIV`
    /// is present but is not [`IV_LEN`] bytes.
    pub fn detect(data: &EncryptionData) -> Result<Self, EncryptionError> {
        let Some(raw) = data.content_encryption_iv.as_deref() else {
            return Ok(IvScheme::Deterministic);
        };
        let iv: [u8; IV_LEN] = raw.try_into().map_err(|_| {
            EncryptionError::InvalidMetadata(format!(
                "ContentEncryptionIV must be {IV_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(if data.key_wrapping_metadata.is_some() {
            IvScheme::Current(iv)
        } else {
            IvScheme::SharedIv(iv)
        })
    }

    /// The content IV to store in metadata, if the scheme has one.
    pub fn content_iv(&self) -> Option<&[u8; IV_LEN]> {
        match self {
            IvScheme::Current(iv) | IvScheme::SharedIv(iv) => Some(iv),
            IvScheme::Deterministic => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            IvScheme::Current(_) => "current",
            IvScheme::SharedIv(_) => "shared-iv",
            IvScheme::Deterministic => "deterministic",
        }
    }

    /// IV for the property `name` of the entity (`partition_key`, `row_key`).
    pub fn property_iv(&self, partition_key: &str, row_key: &str, name: &str) -> [u8; IV_LEN] {
        match self {
            IvScheme::Current(iv) => derive_framed(&[
                iv.as_slice(),
                partition_key.as_bytes(),
                row_key.as_bytes(),
                name.as_bytes(),
            ]),
            IvScheme::SharedIv(iv) => derive(&[iv.as_slice(), name.as_bytes()]),
            IvScheme::Deterministic => {
                derive(&[partition_key.as_bytes(), row_key.as_bytes(), name.as_bytes()])
            }
        }
    }

    /// IV for the encrypted manifest of the entity (`partition_key`, `row_key`).
    pub fn manifest_iv(&self, partition_key: &str, row_key: &str) -> [u8; IV_LEN] {
        let identity = [partition_key.as_bytes(), row_key.as_bytes(), METADATA2.as_bytes()];
        match self {
            IvScheme::Current(iv) => {
                derive_framed(&[iv.as_slice(), identity[0], identity[1], identity[2]])
            }
            IvScheme::SharedIv(iv) => derive(&[iv.as_slice(), identity[0], identity[1], identity[2]]),
            IvScheme::Deterministic => derive(&identity),
        }
    }
}

fn derive(parts: &[&[u8]]) -> [u8; IV_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    truncate(hasher)
}

fn derive_framed(parts: &[&[u8]]) -> [u8; IV_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        // Entity keys and property names are far below 4 GiB.
        hasher.update((part.len() as u32).to_le_bytes());
        hasher.update(part);
    }
    truncate(hasher)
}

fn truncate(hasher: Sha256) -> [u8; IV_LEN] {
    let digest = hasher.finalize();
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&digest[..IV_LEN]);
    iv
}
