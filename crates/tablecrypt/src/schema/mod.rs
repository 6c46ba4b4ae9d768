//! Entity schemas from OpenAPI documents, and the registry that serves them.
//!
//! # Responsibilities
//!
//! - Parse OpenAPI 3 documents (YAML, falling back to JSON).
//! - Index each entity type's property types and its `x-encrypt: true`
//!   properties.
//! - Serve an [`EntitySchema`] per entity type as both the
//!   [`crate::PropertySelector`] for writes and the [`crate::PropertyResolver`]
//!   for reads.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** This module must not import anything from
//!   `crate::crypto` or `crate::keys`.

pub mod cache;
pub mod resolver;

pub use cache::{RegistryError, SchemaRegistry};
pub use resolver::{resolve_entity_schemas, EntitySchema};

use openapiv3::OpenAPI;

/// Parse an OpenAPI document, trying YAML first and JSON second.
///
/// # Errors
///
/// Returns [`RegistryError::Parse`] if `text` is neither.
pub fn parse_document(text: &str) -> Result<OpenAPI, RegistryError> {
    match serde_yaml::from_str(text) {
        Ok(api) => Ok(api),
        Err(yaml_err) => serde_json::from_str(text).map_err(|json_err| {
            RegistryError::Parse(format!("not valid YAML ({yaml_err}) or JSON ({json_err})"))
        }),
    }
}

/// Derive an entity type name from a schema file path.
///
/// Strips any directory and the extension (`.yaml`, `.yml`, `.json`).
pub fn schema_name_from_path(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    for ext in [".yaml", ".yml", ".json"] {
        if let Some(stem) = file.strip_suffix(ext) {
            return stem;
        }
    }
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_and_json_both_parse() {
        let yaml = "openapi: \"3.0.0\"\ninfo:\n  title: t\n  version: \"1\"\npaths: {}\n";
        let json = r#"{"openapi":"3.0.0","info":{"title":"t","version":"1"},"paths":{}}"#;
        assert!(parse_document(yaml).is_ok());
        assert!(parse_document(json).is_ok());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(parse_document("[1, 2"), Err(RegistryError::Parse(_))));
    }

    #[test]
    fn schema_name_strips_directory_and_extension() {
        assert_eq!(schema_name_from_path("schemas/customers.yaml"), "customers");
        assert_eq!(schema_name_from_path("orders.json"), "orders");
        assert_eq!(schema_name_from_path("a/b/c.yml"), "c");
        assert_eq!(schema_name_from_path("bare"), "bare");
    }
}
