//! JSON representation of entities.
//!
//! Two payload flavours are supported:
//!
//! - [`JsonFormat::FullMetadata`]: values whose JSON shape is ambiguous carry a
//!   `<name>@odata.type` annotation, so the payload is self-describing.
//! - [`JsonFormat::NoMetadata`]: no annotations. Binary, Int64, DateTime and
//!   Guid values come back as plain strings unless the reader supplies a type
//!   resolver. Encrypted properties therefore arrive as base64 strings.

use serde_json::{Map, Number, Value};

use crate::entity::{DynamicEntity, EdmType, EntityProperty};
use crate::error::ModelError;

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";

const TYPE_ANNOTATION_SUFFIX: &str = "@odata.type";

/// Payload flavour used by [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    #[default]
    FullMetadata,
    NoMetadata,
}

/// Type resolver consulted by [`decode`] for unannotated string members:
/// `(partition_key, row_key, property_name, raw_value) -> type`.
pub type WireTypeResolver<'a> = &'a dyn Fn(&str, &str, &str, &str) -> EdmType;

/// Encode an entity as a JSON object.
pub fn encode(entity: &DynamicEntity, format: JsonFormat) -> Value {
    let mut map = Map::new();
    map.insert(PARTITION_KEY.into(), Value::String(entity.partition_key.clone()));
    map.insert(ROW_KEY.into(), Value::String(entity.row_key.clone()));

    for (name, prop) in &entity.properties {
        map.insert(name.clone(), encode_value(prop));
        if format == JsonFormat::FullMetadata && needs_annotation(prop) {
            map.insert(
                format!("{name}{TYPE_ANNOTATION_SUFFIX}"),
                Value::String(prop.edm_type().as_str().into()),
            );
        }
    }
    Value::Object(map)
}

fn needs_annotation(prop: &EntityProperty) -> bool {
    !matches!(
        prop,
        EntityProperty::String(_) | EntityProperty::Boolean(_) | EntityProperty::Int32(_)
    )
}

fn encode_value(prop: &EntityProperty) -> Value {
    match prop {
        EntityProperty::Boolean(Some(b)) => Value::Bool(*b),
        EntityProperty::Int32(Some(n)) => Value::Number((*n).into()),
        EntityProperty::Double(Some(d)) => Number::from_f64(*d)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(d.to_string())),
        other => other.to_wire_string().map(Value::String).unwrap_or(Value::Null),
    }
}

/// Decode a JSON object into an entity.
///
/// Annotated members are parsed as their annotation says. Unannotated strings
/// are passed to `resolver` (when given) to pick their type, and are strings
/// otherwise. `odata.*` members and `Timestamp` are ignored.
///
/// # Errors
///
/// Returns [`ModelError::MalformedPayload`] if `value` is not an object with
/// string `PartitionKey` and `RowKey`, and a per-property error for members
/// that cannot be converted.
pub fn decode(value: &Value, resolver: Option<WireTypeResolver<'_>>) -> Result<DynamicEntity, ModelError> {
    let map = value
        .as_object()
        .ok_or_else(|| ModelError::MalformedPayload("expected a JSON object".into()))?;

    let key = |field: &str| -> Result<String, ModelError> {
        map.get(field)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ModelError::MalformedPayload(format!("missing string {field}")))
    };
    let mut entity = DynamicEntity::new(key(PARTITION_KEY)?, key(ROW_KEY)?);

    for (name, member) in map {
        if is_system_member(name) {
            continue;
        }
        let annotation = map
            .get(&format!("{name}{TYPE_ANNOTATION_SUFFIX}"))
            .and_then(Value::as_str);

        let prop = match annotation {
            Some(a) => {
                let edm_type = a.parse::<EdmType>().map_err(|()| ModelError::UnknownType {
                    property: name.clone(),
                    annotation: a.to_owned(),
                })?;
                decode_typed(name, edm_type, member)?
            }
            None => decode_untyped(&entity, name, member, resolver)?,
        };
        entity.properties.insert(name.clone(), prop);
    }
    Ok(entity)
}

fn is_system_member(name: &str) -> bool {
    name == PARTITION_KEY
        || name == ROW_KEY
        || name == TIMESTAMP
        || name.starts_with("odata.")
        || name.ends_with(TYPE_ANNOTATION_SUFFIX)
}

fn decode_typed(name: &str, edm_type: EdmType, member: &Value) -> Result<EntityProperty, ModelError> {
    match member {
        Value::Null => Ok(EntityProperty::null(edm_type)),
        Value::String(s) => EntityProperty::parse(name, edm_type, s),
        Value::Number(n) => EntityProperty::parse(name, edm_type, &n.to_string()),
        Value::Bool(b) => EntityProperty::parse(name, edm_type, &b.to_string()),
        _ => Err(ModelError::UnsupportedJson(name.to_owned())),
    }
}

fn decode_untyped(
    entity: &DynamicEntity,
    name: &str,
    member: &Value,
    resolver: Option<WireTypeResolver<'_>>,
) -> Result<EntityProperty, ModelError> {
    match member {
        Value::Null => Ok(EntityProperty::String(None)),
        Value::Bool(b) => Ok(EntityProperty::Boolean(Some(*b))),
        Value::String(s) => match resolver {
            Some(resolve) => {
                let edm_type = resolve(&entity.partition_key, &entity.row_key, name, s);
                EntityProperty::parse(name, edm_type, s)
            }
            None => Ok(EntityProperty::string(s.as_str())),
        },
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(match i32::try_from(i) {
                    Ok(small) => EntityProperty::Int32(Some(small)),
                    Err(_) => EntityProperty::Int64(Some(i)),
                })
            } else {
                n.as_f64()
                    .map(|d| EntityProperty::Double(Some(d)))
                    .ok_or_else(|| ModelError::UnsupportedJson(name.to_owned()))
            }
        }
        _ => Err(ModelError::UnsupportedJson(name.to_owned())),
    }
}
