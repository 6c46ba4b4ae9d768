//! `tablecrypt`: field-level envelope encryption for schema-less table entities.
//!
//! Selected string properties are encrypted with a fresh AES-256 content key
//! per entity. The content key is wrapped under a caller-supplied key-encryption
//! key and stored next to the data, together with an encrypted manifest of the
//! encrypted property names that is bound to the entity's partition and row
//! keys.
//!
//! Write path:
//!
//! ```text
//! entity → selector → per-property AES-CBC → AES-KW wrap → manifest → encrypted entity
//! ```
//!
//! Read path is the mirror image. See [`policy::EncryptionPolicy`].
//!
//! # Module layout
//!
//! - [`crypto`]: cipher, key wrap, and IV derivation primitives. No entity types.
//! - [`keys`]: key material and key resolution.
//! - [`manifest`]: the identity-bound list of encrypted properties.
//! - [`selector`]: caller-supplied selection and type-resolution hooks.
//! - [`schema`]: optional registry deriving selectors from OpenAPI documents.
//! - [`policy`]: the orchestrator.

pub mod config;
pub mod crypto;
pub mod error;
pub mod keys;
pub mod manifest;
pub mod policy;
pub mod schema;
pub mod selector;

pub use config::EncryptionSettings;
pub use error::EncryptionError;
pub use keys::{ContentKey, DictionaryKeyResolver, KeyResolver, SymmetricKey};
pub use policy::{EncryptionPolicy, EncryptionPolicyBuilder};
pub use schema::{EntitySchema, RegistryError, SchemaRegistry};
pub use selector::{PropertyNames, PropertyResolver, PropertySelector};
