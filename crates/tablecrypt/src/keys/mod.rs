//! Key material and key resolution.
//!
//! # Lifecycle
//!
//! 1. The caller supplies a key-encryption key ([`SymmetricKey`]) on the write
//!    path, or a [`KeyResolver`] on the read path.
//! 2. Every encrypt call generates a fresh [`ContentKey`], wraps it under the
//!    key-encryption key, and drops it before returning.
//! 3. Every decrypt call unwraps the content key, uses it, and drops it.
//!
//! # Security invariants
//!
//! - Key bytes are **never** logged, included in `Debug` output, or persisted
//!   in any form other than the wrapped content key.
//! - Content keys never outlive a single call and are zeroed on drop.

pub mod material;
pub mod resolver;

pub use material::{ContentKey, SymmetricKey};
pub use resolver::{DictionaryKeyResolver, KeyResolver};

#[cfg(test)]
pub use resolver::MockKeyResolver;
