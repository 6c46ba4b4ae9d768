//! Key material: caller-owned key-encryption keys and per-entity content keys.

use std::fmt;

use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::KEY_LEN;

/// A key-encryption key together with its id.
///
/// The id is persisted next to every content key wrapped with this key, and is
/// what a [`super::KeyResolver`] is asked for on the read path. The key bytes
/// are zeroed when the last clone is dropped and never appear in `Debug`
/// output.
#[derive(Clone)]
pub struct SymmetricKey {
    key_id: String,
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Wrap raw key bytes. Length is checked by the key-wrap algorithm, not here.
    pub fn new(key_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            bytes: Zeroizing::new(bytes.into()),
        }
    }

    /// Generate a random 256-bit key. Intended for tests and tooling.
    pub fn generate(key_id: impl Into<String>) -> Self {
        let mut bytes = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self::new(key_id, bytes)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Raw key bytes. Do not log or serialise the result.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key_id", &self.key_id)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 256-bit content-encryption key, generated fresh for every encrypted
/// entity.
///
/// Lives only for the duration of one encrypt or decrypt call and is zeroed on
/// drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_LEN]);

impl ContentKey {
    /// Generate a new key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Copy a key out of a slice, or `None` if it is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("ContentKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_key_redacted_in_debug() {
        let key = SymmetricKey::new("kek-1", vec![0xAB; 32]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("kek-1"));
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"));
    }

    #[test]
    fn content_key_redacted_in_debug() {
        assert!(format!("{:?}", ContentKey::generate()).contains("REDACTED"));
    }

    #[test]
    fn generated_content_keys_differ() {
        assert_ne!(ContentKey::generate().as_bytes(), ContentKey::generate().as_bytes());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(ContentKey::from_slice(&[0u8; KEY_LEN]).is_some());
        assert!(ContentKey::from_slice(&[0u8; 16]).is_none());
    }

    #[test]
    fn generated_kek_is_256_bits() {
        let key = SymmetricKey::generate("k");
        assert_eq!(key.len(), KEY_LEN);
        assert_eq!(key.key_id(), "k");
    }
}
