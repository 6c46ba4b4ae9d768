//! In-memory registry of entity schemas, keyed by entity type name.
//!
//! The registry uses `arc-swap` for lock-free reads on the encrypt and decrypt
//! paths. It can be switched off at runtime; a disabled registry answers every
//! lookup with [`RegistryError::Disabled`].

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::info;

use super::parse_document;
use super::resolver::{resolve_entity_schemas, EntitySchema};
use crate::config::EncryptionSettings;

/// Errors from the schema registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Lookups are switched off.
    #[error("schema registry is disabled")]
    Disabled,

    /// The requested entity type has no entry in the registry.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// The document is neither a YAML nor a JSON OpenAPI document.
    #[error("failed to parse OpenAPI document: {0}")]
    Parse(String),

    /// A property marked for encryption is not a string.
    #[error("schema {schema}: property {property} is marked x-encrypt but is not a string")]
    NonStringEncrypted { schema: String, property: String },
}

/// Shared, lock-free registry of entity schemas.
///
/// Clones share the same map and the same enabled flag.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    inner: Arc<ArcSwap<HashMap<String, Arc<EntitySchema>>>>,
    enabled: Arc<AtomicBool>,
}

impl SchemaRegistry {
    /// Create a new, empty, enabled registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create an empty registry, enabled according to `settings`.
    pub fn from_settings(settings: &EncryptionSettings) -> Self {
        let registry = Self::new();
        registry.set_enabled(settings.schema_registry_enabled);
        registry
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Return the number of schemas currently registered.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Look up the schema of entity type `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Disabled`] if the registry is switched off, or
    /// [`RegistryError::UnknownSchema`] if `name` is not registered.
    pub fn get(&self, name: &str) -> Result<Arc<EntitySchema>, RegistryError> {
        if !self.is_enabled() {
            return Err(RegistryError::Disabled);
        }
        self.inner
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSchema(name.to_owned()))
    }

    /// Atomically replace the entire schema map.
    pub fn replace_all(&self, schemas: impl IntoIterator<Item = EntitySchema>) {
        let new_map: HashMap<String, Arc<EntitySchema>> = schemas
            .into_iter()
            .map(|schema| (schema.name.clone(), Arc::new(schema)))
            .collect();
        self.inner.store(Arc::new(new_map));
    }

    /// Parse an OpenAPI document (YAML or JSON) and replace the registry with
    /// the entity schemas it defines. Returns the number of schemas loaded.
    ///
    /// On error the previous contents are kept.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if the document does not parse, or
    /// [`RegistryError::NonStringEncrypted`] if it marks a non-string property
    /// for encryption.
    pub fn load_document(&self, text: &str) -> Result<usize, RegistryError> {
        let api = parse_document(text)?;
        let schemas = resolve_entity_schemas(&api)?;
        self.replace_all(schemas.into_values());
        info!(count = self.len(), "schema registry loaded");
        Ok(self.len())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> EntitySchema {
        EntitySchema {
            name: name.into(),
            ..EntitySchema::default()
        }
    }

    const ORDERS_JSON: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {"Order": {
            "type": "object",
            "properties": {"card": {"type": "string", "x-encrypt": true}}
        }}}
    }"#;

    #[test]
    fn initially_empty() {
        let registry = SchemaRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.is_enabled());
    }

    #[test]
    fn unknown_schema_returns_error() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.get("nonexistent"),
            Err(RegistryError::UnknownSchema(_))
        ));
    }

    #[test]
    fn replace_all_is_atomic() {
        let registry = SchemaRegistry::new();
        registry.replace_all([schema("a")]);
        registry.replace_all([schema("b")]);

        assert!(registry.get("a").is_err());
        assert!(registry.get("b").is_ok());
    }

    #[test]
    fn disabled_registry_refuses_lookups() {
        let registry = SchemaRegistry::new();
        registry.replace_all([schema("a")]);
        let clone = registry.clone();
        clone.set_enabled(false);
        assert!(matches!(registry.get("a"), Err(RegistryError::Disabled)));
        registry.set_enabled(true);
        assert!(clone.get("a").is_ok());
    }

    #[test]
    fn settings_control_enabled_flag() {
        let settings = EncryptionSettings {
            schema_registry_enabled: false,
            ..EncryptionSettings::default()
        };
        assert!(!SchemaRegistry::from_settings(&settings).is_enabled());
    }

    #[test]
    fn load_json_document() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.load_document(ORDERS_JSON).unwrap(), 1);
        assert!(registry.get("Order").unwrap().is_encrypted("card"));
    }

    #[test]
    fn failed_load_keeps_previous_contents() {
        let registry = SchemaRegistry::new();
        registry.load_document(ORDERS_JSON).unwrap();
        assert!(matches!(
            registry.load_document("{ not an openapi document"),
            Err(RegistryError::Parse(_))
        ));
        assert!(registry.get("Order").is_ok());
    }
}
