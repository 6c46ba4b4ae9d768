//! Key resolution on the read path.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;

use super::material::SymmetricKey;

/// Looks up a key-encryption key by the id stored in an entity's metadata.
///
/// Implementations must be safe for concurrent read-only use. Returning
/// `None` makes the decrypt call fail with
/// [`crate::EncryptionError::KeyMismatch`].
#[cfg_attr(test, mockall::automock)]
pub trait KeyResolver: Send + Sync {
    fn resolve_key(&self, key_id: &str) -> Option<SymmetricKey>;
}

impl<F> KeyResolver for F
where
    F: Fn(&str) -> Option<SymmetricKey> + Send + Sync,
{
    fn resolve_key(&self, key_id: &str) -> Option<SymmetricKey> {
        self(key_id)
    }
}

/// In-memory `key id → key` map.
///
/// Backed by [`ArcSwap`] so lookups never block; [`insert`](Self::insert) and
/// [`remove`](Self::remove) publish a new snapshot atomically. Clones share
/// the same map.
#[derive(Clone, Debug)]
pub struct DictionaryKeyResolver {
    inner: Arc<ArcSwap<HashMap<String, SymmetricKey>>>,
}

impl DictionaryKeyResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Create a resolver holding `keys`, indexed by their ids.
    pub fn from_keys(keys: impl IntoIterator<Item = SymmetricKey>) -> Self {
        let map: HashMap<String, SymmetricKey> = keys
            .into_iter()
            .map(|k| (k.key_id().to_owned(), k))
            .collect();
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(map))),
        }
    }

    /// Add or replace the key with the same id.
    pub fn insert(&self, key: SymmetricKey) {
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key.key_id().to_owned(), key.clone());
            next
        });
    }

    /// Remove the key with `key_id`, returning `true` if it was present.
    pub fn remove(&self, key_id: &str) -> bool {
        let previous = self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.remove(key_id);
            next
        });
        previous.contains_key(key_id)
    }

    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for DictionaryKeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver for DictionaryKeyResolver {
    fn resolve_key(&self, key_id: &str) -> Option<SymmetricKey> {
        self.inner.load().get(key_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initially_empty() {
        let resolver = DictionaryKeyResolver::new();
        assert!(resolver.is_empty());
        assert!(resolver.resolve_key("k").is_none());
    }

    #[test]
    fn insert_and_resolve() {
        let resolver = DictionaryKeyResolver::new();
        resolver.insert(SymmetricKey::new("k1", vec![1u8; 32]));
        let key = resolver.resolve_key("k1").unwrap();
        assert_eq!(key.as_bytes(), &[1u8; 32]);
        assert!(resolver.resolve_key("k2").is_none());
    }

    #[test]
    fn insert_replaces_key_with_same_id() {
        let resolver = DictionaryKeyResolver::new();
        resolver.insert(SymmetricKey::new("k", vec![1u8; 32]));
        resolver.insert(SymmetricKey::new("k", vec![2u8; 32]));
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve_key("k").unwrap().as_bytes(), &[2u8; 32]);
    }

    #[test]
    fn clones_share_the_map() {
        let resolver = DictionaryKeyResolver::from_keys([SymmetricKey::new("a", vec![0u8; 32])]);
        let clone = resolver.clone();
        clone.insert(SymmetricKey::new("b", vec![0u8; 32]));
        assert_eq!(resolver.len(), 2);
        assert!(resolver.remove("a"));
        assert!(!clone.remove("a"));
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn closures_are_resolvers() {
        let only = SymmetricKey::new("only", vec![0u8; 32]);
        let resolver = move |id: &str| (id == "only").then(|| only.clone());
        assert!(resolver.resolve_key("only").is_some());
        assert!(resolver.resolve_key("other").is_none());
    }
}
