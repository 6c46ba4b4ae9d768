//! Schema-less property-bag entities and their typed values.
//!
//! An entity is identified by its partition key and row key. Everything else
//! lives in an unordered map of named, typed properties. Every value kind can
//! be null; a null keeps its type tag so that it survives a round trip.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::ModelError;

/// Type tag of an entity property, named after the EDM primitive types used
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmType {
    String,
    Binary,
    Boolean,
    Int32,
    Int64,
    Double,
    DateTime,
    Guid,
}

impl EdmType {
    /// Wire name of the type, e.g. `"Edm.Int64"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdmType::String => "Edm.String",
            EdmType::Binary => "Edm.Binary",
            EdmType::Boolean => "Edm.Boolean",
            EdmType::Int32 => "Edm.Int32",
            EdmType::Int64 => "Edm.Int64",
            EdmType::Double => "Edm.Double",
            EdmType::DateTime => "Edm.DateTime",
            EdmType::Guid => "Edm.Guid",
        }
    }
}

impl fmt::Display for EdmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdmType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "Edm.String" => EdmType::String,
            "Edm.Binary" => EdmType::Binary,
            "Edm.Boolean" => EdmType::Boolean,
            "Edm.Int32" => EdmType::Int32,
            "Edm.Int64" => EdmType::Int64,
            "Edm.Double" => EdmType::Double,
            "Edm.DateTime" => EdmType::DateTime,
            "Edm.Guid" => EdmType::Guid,
            _ => return Err(()),
        };
        Ok(ty)
    }
}

/// A single typed property value. `None` is a typed null.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityProperty {
    String(Option<String>),
    Binary(Option<Vec<u8>>),
    Boolean(Option<bool>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Double(Option<f64>),
    DateTime(Option<DateTime<Utc>>),
    Guid(Option<Uuid>),
}

impl EntityProperty {
    /// Non-null string property.
    pub fn string(value: impl Into<String>) -> Self {
        EntityProperty::String(Some(value.into()))
    }

    /// Non-null binary property.
    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        EntityProperty::Binary(Some(value.into()))
    }

    /// Typed null of the given kind.
    pub fn null(edm_type: EdmType) -> Self {
        match edm_type {
            EdmType::String => EntityProperty::String(None),
            EdmType::Binary => EntityProperty::Binary(None),
            EdmType::Boolean => EntityProperty::Boolean(None),
            EdmType::Int32 => EntityProperty::Int32(None),
            EdmType::Int64 => EntityProperty::Int64(None),
            EdmType::Double => EntityProperty::Double(None),
            EdmType::DateTime => EntityProperty::DateTime(None),
            EdmType::Guid => EntityProperty::Guid(None),
        }
    }

    /// The type tag of this value.
    pub fn edm_type(&self) -> EdmType {
        match self {
            EntityProperty::String(_) => EdmType::String,
            EntityProperty::Binary(_) => EdmType::Binary,
            EntityProperty::Boolean(_) => EdmType::Boolean,
            EntityProperty::Int32(_) => EdmType::Int32,
            EntityProperty::Int64(_) => EdmType::Int64,
            EntityProperty::Double(_) => EdmType::Double,
            EntityProperty::DateTime(_) => EdmType::DateTime,
            EntityProperty::Guid(_) => EdmType::Guid,
        }
    }

    /// Returns `true` for a typed null.
    pub fn is_null(&self) -> bool {
        match self {
            EntityProperty::String(v) => v.is_none(),
            EntityProperty::Binary(v) => v.is_none(),
            EntityProperty::Boolean(v) => v.is_none(),
            EntityProperty::Int32(v) => v.is_none(),
            EntityProperty::Int64(v) => v.is_none(),
            EntityProperty::Double(v) => v.is_none(),
            EntityProperty::DateTime(v) => v.is_none(),
            EntityProperty::Guid(v) => v.is_none(),
        }
    }

    /// Borrow the value of a non-null string property.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntityProperty::String(Some(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value of a non-null binary property.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            EntityProperty::Binary(Some(b)) => Some(b),
            _ => None,
        }
    }

    /// Canonical string form of a non-null value, as it appears on the wire.
    ///
    /// Binary values are base64, date-times RFC 3339 with a `Z` suffix.
    pub fn to_wire_string(&self) -> Option<String> {
        match self {
            EntityProperty::String(v) => v.clone(),
            EntityProperty::Binary(v) => v.as_ref().map(|b| STANDARD.encode(b)),
            EntityProperty::Boolean(v) => v.map(|b| b.to_string()),
            EntityProperty::Int32(v) => v.map(|n| n.to_string()),
            EntityProperty::Int64(v) => v.map(|n| n.to_string()),
            EntityProperty::Double(v) => v.map(|n| n.to_string()),
            EntityProperty::DateTime(v) => {
                v.map(|d| d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            EntityProperty::Guid(v) => v.map(|g| g.hyphenated().to_string()),
        }
    }

    /// Parse a raw string into a value of `edm_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] naming `property` if `raw` is not a
    /// valid representation of `edm_type`.
    pub fn parse(property: &str, edm_type: EdmType, raw: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidValue {
            property: property.to_owned(),
            edm_type,
        };
        let value = match edm_type {
            EdmType::String => EntityProperty::string(raw),
            EdmType::Binary => EntityProperty::binary(STANDARD.decode(raw).map_err(|_| invalid())?),
            EdmType::Boolean => EntityProperty::Boolean(Some(raw.parse().map_err(|_| invalid())?)),
            EdmType::Int32 => EntityProperty::Int32(Some(raw.parse().map_err(|_| invalid())?)),
            EdmType::Int64 => EntityProperty::Int64(Some(raw.parse().map_err(|_| invalid())?)),
            EdmType::Double => EntityProperty::Double(Some(raw.parse().map_err(|_| invalid())?)),
            EdmType::DateTime => {
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?;
                EntityProperty::DateTime(Some(parsed.with_timezone(&Utc)))
            }
            EdmType::Guid => EntityProperty::Guid(Some(Uuid::parse_str(raw).map_err(|_| invalid())?)),
        };
        Ok(value)
    }
}

impl From<&str> for EntityProperty {
    fn from(value: &str) -> Self {
        EntityProperty::string(value)
    }
}

impl From<String> for EntityProperty {
    fn from(value: String) -> Self {
        EntityProperty::String(Some(value))
    }
}

impl From<i32> for EntityProperty {
    fn from(value: i32) -> Self {
        EntityProperty::Int32(Some(value))
    }
}

impl From<i64> for EntityProperty {
    fn from(value: i64) -> Self {
        EntityProperty::Int64(Some(value))
    }
}

impl From<bool> for EntityProperty {
    fn from(value: bool) -> Self {
        EntityProperty::Boolean(Some(value))
    }
}

impl From<f64> for EntityProperty {
    fn from(value: f64) -> Self {
        EntityProperty::Double(Some(value))
    }
}

/// A schema-less entity: identity plus a bag of named properties.
///
/// `partition_key` and `row_key` are never part of `properties` and are never
/// encrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicEntity {
    pub partition_key: String,
    pub row_key: String,
    pub properties: BTreeMap<String, EntityProperty>,
}

impl DynamicEntity {
    /// Create an entity with no properties.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<EntityProperty>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<EntityProperty>,
    ) -> Option<EntityProperty> {
        self.properties.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&EntityProperty> {
        self.properties.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<EntityProperty> {
        self.properties.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Number of properties, not counting the two identity keys.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
