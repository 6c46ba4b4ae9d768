//! Cryptographic primitives for property encryption.
//!
//! This module is intentionally free of entity types. It provides:
//!
//! - [`cipher`]: AES-256-CBC with PKCS#7 padding over raw property bytes.
//! - [`key_wrap`]: wrapping the content key under a key-encryption key.
//! - [`iv`]: per-property and manifest IV derivation, current and legacy.
//!
//! AES-CBC and AES-KW are a fixed external contract: entities written by
//! other table clients must keep decrypting.

pub mod cipher;
pub mod iv;
pub mod key_wrap;

pub use cipher::{CipherError, BLOCK_LEN, IV_LEN, KEY_LEN};
pub use iv::IvScheme;
pub use key_wrap::{AesKeyWrap, KeyWrapAlgorithm};
