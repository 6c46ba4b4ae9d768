//! Entity schema resolution from OpenAPI documents.
//!
//! Every object schema under `components/schemas` describes one entity type.
//! Its top-level properties give the type of each entity property, and
//! properties annotated `x-encrypt: true` are the ones to encrypt.

use std::collections::{BTreeSet, HashMap};

use common::EdmType;
use openapiv3::{
    IntegerFormat, OpenAPI, ReferenceOr, Schema, SchemaKind, StringFormat, Type,
    VariantOrUnknownOrEmpty,
};

use super::cache::RegistryError;
use crate::selector::{PropertyResolver, PropertySelector};

/// Extension key marking a property for encryption.
pub const ENCRYPT_EXTENSION: &str = "x-encrypt";

/// Encryption view of one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: String,
    /// Properties to encrypt. Always string-typed.
    pub encrypted: BTreeSet<String>,
    /// Declared type of every property with a scalar type.
    pub types: HashMap<String, EdmType>,
}

impl EntitySchema {
    pub fn is_encrypted(&self, property: &str) -> bool {
        self.encrypted.contains(property)
    }

    /// Declared type of `property`, if the schema has one.
    pub fn edm_type(&self, property: &str) -> Option<EdmType> {
        self.types.get(property).copied()
    }
}

impl PropertySelector for EntitySchema {
    fn should_encrypt(&self, _partition_key: &str, _row_key: &str, property_name: &str) -> bool {
        self.is_encrypted(property_name)
    }
}

impl PropertyResolver for EntitySchema {
    fn resolve(&self, _partition_key: &str, _row_key: &str, property_name: &str, _value: &str) -> EdmType {
        self.edm_type(property_name).unwrap_or(EdmType::String)
    }
}

/// Walk `components/schemas` of `api` and build an [`EntitySchema`] for every
/// object schema, keyed by component name.
///
/// # Errors
///
/// Returns [`RegistryError::NonStringEncrypted`] if a property marked
/// `x-encrypt: true` is not a string.
pub fn resolve_entity_schemas(api: &OpenAPI) -> Result<HashMap<String, EntitySchema>, RegistryError> {
    let mut schemas = HashMap::new();

    let Some(components) = &api.components else {
        return Ok(schemas);
    };

    for (name, schema_ref) in &components.schemas {
        if let ReferenceOr::Item(schema) = schema_ref {
            if let Some(entity) = entity_schema(name, schema)? {
                schemas.insert(name.clone(), entity);
            }
        }
    }

    Ok(schemas)
}

fn entity_schema(name: &str, schema: &Schema) -> Result<Option<EntitySchema>, RegistryError> {
    let SchemaKind::Type(Type::Object(object)) = &schema.schema_kind else {
        return Ok(None);
    };

    let mut entity = EntitySchema {
        name: name.to_owned(),
        ..EntitySchema::default()
    };

    for (property, property_ref) in &object.properties {
        // $ref properties are nested documents; entities are flat.
        let ReferenceOr::Item(property_schema) = property_ref else {
            continue;
        };
        let edm_type = edm_type_of(property_schema);
        if let Some(edm_type) = edm_type {
            entity.types.insert(property.clone(), edm_type);
        }

        let marked = property_schema
            .schema_data
            .extensions
            .get(ENCRYPT_EXTENSION)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if marked {
            if edm_type != Some(EdmType::String) {
                return Err(RegistryError::NonStringEncrypted {
                    schema: name.to_owned(),
                    property: property.clone(),
                });
            }
            entity.encrypted.insert(property.clone());
        }
    }

    Ok(Some(entity))
}

/// Map an OpenAPI property type to the entity type it is stored as.
fn edm_type_of(schema: &Schema) -> Option<EdmType> {
    let SchemaKind::Type(ty) = &schema.schema_kind else {
        return None;
    };
    let edm_type = match ty {
        Type::String(s) => match &s.format {
            VariantOrUnknownOrEmpty::Item(StringFormat::Byte | StringFormat::Binary) => EdmType::Binary,
            VariantOrUnknownOrEmpty::Item(StringFormat::DateTime) => EdmType::DateTime,
            VariantOrUnknownOrEmpty::Unknown(format) if format == "uuid" => EdmType::Guid,
            _ => EdmType::String,
        },
        Type::Integer(i) => match &i.format {
            VariantOrUnknownOrEmpty::Item(IntegerFormat::Int64) => EdmType::Int64,
            _ => EdmType::Int32,
        },
        Type::Number { .. } => EdmType::Double,
        Type::Boolean { .. } => EdmType::Boolean,
        Type::Object { .. } | Type::Array { .. } => return None,
    };
    Some(edm_type)
}
