//! Wrapping the content key under a key-encryption key.
//!
//! The wrap algorithm is a strategy ([`KeyWrapAlgorithm`]) so that a policy
//! can be configured with something other than the default [`AesKeyWrap`].
//! Whatever the algorithm, the persisted form is a
//! [`WrappedContentKey`]: opaque bytes, the algorithm name, and the id of the
//! key-encryption key. The content key itself is never persisted.

use std::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::{Aes128, Aes192, Aes256};
use aes_kw::Kek;
use common::protocol::WrappedContentKey;

use super::cipher::{CipherError, KEY_LEN};
use crate::error::EncryptionError;
use crate::keys::{ContentKey, SymmetricKey};

/// RFC 3394 algorithm names, by key-encryption key length.
pub const A128KW: &str = "A128KW";
pub const A192KW: &str = "A192KW";
pub const A256KW: &str = "A256KW";

/// Strategy for wrapping and unwrapping content keys.
pub trait KeyWrapAlgorithm: Send + Sync + fmt::Debug {
    /// Wrap `cek` under `kek`.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidKeyLength`] if `kek` cannot be used by
    /// this algorithm.
    fn wrap(&self, cek: &ContentKey, kek: &SymmetricKey) -> Result<WrappedContentKey, EncryptionError>;

    /// Recover the content key from `wrapped` using `kek`.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::KeyMismatch`] if `wrapped` was not produced
    /// with `kek` (different id, different algorithm, or failed integrity
    /// check).
    fn unwrap(&self, wrapped: &WrappedContentKey, kek: &SymmetricKey) -> Result<ContentKey, EncryptionError>;
}

/// AES key wrap (RFC 3394) with a 128-, 192- or 256-bit key-encryption key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesKeyWrap;

impl AesKeyWrap {
    /// The algorithm name used for a key-encryption key of `len` bytes.
    pub fn algorithm_for(len: usize) -> Option<&'static str> {
        match len {
            16 => Some(A128KW),
            24 => Some(A192KW),
            32 => Some(A256KW),
            _ => None,
        }
    }

    fn checked_algorithm(kek: &SymmetricKey) -> Result<&'static str, EncryptionError> {
        Self::algorithm_for(kek.len()).ok_or_else(|| EncryptionError::InvalidKeyLength {
            key_id: kek.key_id().to_owned(),
            actual: kek.len(),
        })
    }
}

enum Direction {
    Wrap,
    Unwrap,
}

/// Run RFC 3394 with the AES variant matching the key length. The caller has
/// already validated the length.
fn run(kek: &[u8], data: &[u8], direction: Direction) -> Result<Vec<u8>, aes_kw::Error> {
    macro_rules! with_kek {
        ($aes:ty) => {{
            let kek = Kek::<$aes>::new(GenericArray::from_slice(kek));
            match direction {
                Direction::Wrap => kek.wrap_vec(data),
                Direction::Unwrap => kek.unwrap_vec(data),
            }
        }};
    }
    match kek.len() {
        16 => with_kek!(Aes128),
        24 => with_kek!(Aes192),
        _ => with_kek!(Aes256),
    }
}

impl KeyWrapAlgorithm for AesKeyWrap {
    fn wrap(&self, cek: &ContentKey, kek: &SymmetricKey) -> Result<WrappedContentKey, EncryptionError> {
        let algorithm = Self::checked_algorithm(kek)?;
        let encrypted_key = run(kek.as_bytes(), cek.as_bytes(), Direction::Wrap)
            .map_err(|e| CipherError::KeyWrap(e.to_string()))?;
        Ok(WrappedContentKey {
            key_id: kek.key_id().to_owned(),
            encrypted_key,
            algorithm: algorithm.to_owned(),
        })
    }

    fn unwrap(&self, wrapped: &WrappedContentKey, kek: &SymmetricKey) -> Result<ContentKey, EncryptionError> {
        if wrapped.key_id != kek.key_id() {
            return Err(EncryptionError::KeyMismatch(format!(
                "content key was wrapped with key {:?} but key {:?} was supplied",
                wrapped.key_id,
                kek.key_id()
            )));
        }
        let algorithm = Self::checked_algorithm(kek)?;
        if wrapped.algorithm != algorithm {
            return Err(EncryptionError::KeyMismatch(format!(
                "content key was wrapped with {} but key {:?} supports {algorithm}",
                wrapped.algorithm,
                kek.key_id()
            )));
        }
        let raw = zeroize::Zeroizing::new(
            run(kek.as_bytes(), &wrapped.encrypted_key, Direction::Unwrap).map_err(|_| {
                EncryptionError::KeyMismatch(format!(
                    "key {:?} failed to unwrap the content key",
                    kek.key_id()
                ))
            })?,
        );
        ContentKey::from_slice(&raw).ok_or_else(|| {
            EncryptionError::KeyMismatch(format!(
                "unwrapped content key is {} bytes, expected {KEY_LEN}",
                raw.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_unwrap_round_trip_for_each_kek_size() {
        for (len, name) in [(16, A128KW), (24, A192KW), (32, A256KW)] {
            let kek = SymmetricKey::new("kek", vec![0x11u8; len]);
            let cek = ContentKey::generate();
            let wrapped = AesKeyWrap.wrap(&cek, &kek).unwrap();
            assert_eq!(wrapped.algorithm, name);
            assert_eq!(wrapped.key_id, "kek");
            assert_eq!(wrapped.encrypted_key.len(), KEY_LEN + 8);
            assert_ne!(&wrapped.encrypted_key[..KEY_LEN], cek.as_bytes());
            let unwrapped = AesKeyWrap.unwrap(&wrapped, &kek).unwrap();
            assert_eq!(unwrapped.as_bytes(), cek.as_bytes());
        }
    }

    #[test]
    fn rfc3394_vector() {
        // RFC 3394 §4.6: 256-bit KEK wrapping 256 bits of key data.
        let kek = SymmetricKey::new(
            "rfc",
            (0u8..32).collect::<Vec<u8>>(),
        );
        let data: Vec<u8> = [
            0x00u8, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
            0x0C, 0x0D, 0x0E, 0x0F,
        ]
        .to_vec();
        let cek = ContentKey::from_slice(&data).unwrap();
        let wrapped = AesKeyWrap.wrap(&cek, &kek).unwrap();
        let expected: [u8; 40] = [
            0x28, 0xC9, 0xF4, 0x04, 0xC4, 0xB8, 0x10, 0xF4, 0xCB, 0xCC, 0xB3, 0x5C, 0xFB, 0x87,
            0xF8, 0x26, 0x3F, 0x57, 0x86, 0xE2, 0xD8, 0x0E, 0xD3, 0x26, 0xCB, 0xC7, 0xF0, 0xE7,
            0x1A, 0x99, 0xF4, 0x3B, 0xFB, 0x98, 0x8B, 0x9B, 0x7A, 0x02, 0xDD, 0x21,
        ];
        assert_eq!(wrapped.encrypted_key, expected);
    }

    #[test]
    fn unsupported_kek_length_rejected() {
        let kek = SymmetricKey::new("short", vec![0u8; 10]);
        let err = AesKeyWrap.wrap(&ContentKey::generate(), &kek).unwrap_err();
        assert!(matches!(err, EncryptionError::InvalidKeyLength { actual: 10, .. }));
    }

    #[test]
    fn key_id_mismatch_rejected() {
        let kek = SymmetricKey::new("a", vec![1u8; 32]);
        let wrapped = AesKeyWrap.wrap(&ContentKey::generate(), &kek).unwrap();
        let other = SymmetricKey::new("b", vec![1u8; 32]);
        assert!(matches!(
            AesKeyWrap.unwrap(&wrapped, &other),
            Err(EncryptionError::KeyMismatch(_))
        ));
    }

    #[test]
    fn wrong_key_bytes_fail_integrity_check() {
        let kek = SymmetricKey::new("a", vec![1u8; 32]);
        let wrapped = AesKeyWrap.wrap(&ContentKey::generate(), &kek).unwrap();
        let impostor = SymmetricKey::new("a", vec![2u8; 32]);
        assert!(matches!(
            AesKeyWrap.unwrap(&wrapped, &impostor),
            Err(EncryptionError::KeyMismatch(_))
        ));
    }

    #[test]
    fn algorithm_mismatch_rejected() {
        let kek = SymmetricKey::new("a", vec![1u8; 16]);
        let mut wrapped = AesKeyWrap.wrap(&ContentKey::generate(), &kek).unwrap();
        wrapped.algorithm = A256KW.into();
        assert!(matches!(
            AesKeyWrap.unwrap(&wrapped, &kek),
            Err(EncryptionError::KeyMismatch(_))
        ));
    }
}
