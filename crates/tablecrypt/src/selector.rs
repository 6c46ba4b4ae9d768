//! Caller-supplied hooks: which properties to encrypt, and what type a
//! decrypted value should be restored to.

use std::collections::BTreeSet;

use common::EdmType;

/// Decides which properties of an entity are encrypted on write.
///
/// Only string properties may be selected; selecting anything else fails the
/// encrypt call with [`crate::EncryptionError::InvalidOperand`].
pub trait PropertySelector: Send + Sync {
    fn should_encrypt(&self, partition_key: &str, row_key: &str, property_name: &str) -> bool;
}

impl<F> PropertySelector for F
where
    F: Fn(&str, &str, &str) -> bool + Send + Sync,
{
    fn should_encrypt(&self, partition_key: &str, row_key: &str, property_name: &str) -> bool {
        self(partition_key, row_key, property_name)
    }
}

/// Restores the type of a decrypted value.
///
/// Encrypted properties lose their type tag on the wire (they travel as
/// binary), so the reader supplies it. Without a resolver every decrypted
/// value comes back as [`EdmType::String`].
pub trait PropertyResolver: Send + Sync {
    fn resolve(&self, partition_key: &str, row_key: &str, property_name: &str, value: &str) -> EdmType;
}

impl<F> PropertyResolver for F
where
    F: Fn(&str, &str, &str, &str) -> EdmType + Send + Sync,
{
    fn resolve(&self, partition_key: &str, row_key: &str, property_name: &str, value: &str) -> EdmType {
        self(partition_key, row_key, property_name, value)
    }
}

/// Selects a fixed set of property names, regardless of entity identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyNames(BTreeSet<String>);

impl PropertyNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl PropertySelector for PropertyNames {
    fn should_encrypt(&self, _partition_key: &str, _row_key: &str, property_name: &str) -> bool {
        self.contains(property_name)
    }
}
