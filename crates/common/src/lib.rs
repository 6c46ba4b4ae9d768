//! Common types, wire definitions, and errors shared across `tablecrypt` crates.

pub mod entity;
pub mod error;
pub mod protocol;
pub mod wire;

pub use entity::{DynamicEntity, EdmType, EntityProperty};
pub use error::ModelError;
