//! AES-256-CBC encryption and decryption of individual property values.
//!
//! **Padding is the tamper signal.** CBC has no authentication tag; a wrong
//! key, a wrong IV on a single-block value, or a modified final block shows up
//! as a PKCS#7 padding failure. Callers surface that as
//! [`crate::EncryptionError::DecryptionFailed`].

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Byte length of an AES-256 content key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of a CBC initialisation vector.
pub const IV_LEN: usize = 16;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The content key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid content key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Ciphertext is empty or not a whole number of blocks.
    #[error("invalid ciphertext length {0}: must be a non-zero multiple of {BLOCK_LEN}")]
    InvalidLength(usize),

    /// PKCS#7 padding check failed after decryption.
    #[error("invalid padding")]
    Padding,

    /// Decryption succeeded but the plaintext is not what the caller expected
    /// (not UTF-8, or not the manifest's JSON framing).
    #[error("malformed plaintext")]
    MalformedPlaintext,

    /// A property named in the manifest holds no ciphertext.
    #[error("ciphertext missing")]
    MissingCiphertext,

    /// Wrapping the content key failed.
    #[error("key wrap failed: {0}")]
    KeyWrap(String),
}

/// Encrypt `plaintext` under `cek` and `iv` with AES-256-CBC + PKCS#7.
///
/// The output is always a whole number of blocks; an empty plaintext yields
/// one block of padding.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `cek` is not [`KEY_LEN`] bytes.
pub fn encrypt_property(plaintext: &[u8], cek: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, CipherError> {
    let enc = Aes256CbcEnc::new_from_slices(cek, iv)
        .map_err(|_| CipherError::InvalidKeyLength(cek.len()))?;
    Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt a value produced by [`encrypt_property`].
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] for a bad key,
/// [`CipherError::InvalidLength`] for truncated input, and
/// [`CipherError::Padding`] when the padding check fails (wrong key, wrong IV,
/// or tampered data).
pub fn decrypt_property(ciphertext: &[u8], cek: &[u8], iv: &[u8; IV_LEN]) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidLength(ciphertext.len()));
    }
    let dec = Aes256CbcDec::new_from_slices(cek, iv)
        .map_err(|_| CipherError::InvalidKeyLength(cek.len()))?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::Padding)
}
