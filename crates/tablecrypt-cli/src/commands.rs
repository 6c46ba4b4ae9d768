//! `encrypt` and `decrypt` over JSON entity payloads.

use std::{fs, io, path::Path};

use common::wire::{self, JsonFormat};
use common::{DynamicEntity, ModelError};
use serde_json::Value;
use tablecrypt::schema::schema_name_from_path;
use tablecrypt::{
    EncryptionError, EncryptionPolicy, EntitySchema, PropertyResolver, RegistryError,
    SchemaRegistry,
};
use thiserror::Error;
use tracing::info;

use crate::cli::{DecryptArgs, EncryptArgs};

/// Errors from a command run.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

impl CommandError {
    /// Short machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Io { .. } => "io_error",
            CommandError::Json(_) => "invalid_json",
            CommandError::Model(e) => e.code(),
            CommandError::Registry(_) => "schema_error",
            CommandError::Encryption(e) => e.code(),
        }
    }
}

/// Run `encrypt`: returns the output payload.
pub fn encrypt(
    args: &EncryptArgs,
    policy: &EncryptionPolicy,
    registry: &SchemaRegistry,
) -> Result<Value, CommandError> {
    let entity_type = args
        .entity_type
        .clone()
        .unwrap_or_else(|| schema_name_from_path(&args.schema.to_string_lossy()).to_owned());
    let schema = load_schema(registry, &args.schema, &entity_type)?;
    let input = read_input(args.input.as_deref())?;

    let output = encrypt_payload(&input, policy, &schema, args.format.into())?;
    info!(entity_type = %entity_type, "encrypt finished");
    Ok(output)
}

/// Run `decrypt`: returns the output payload.
pub fn decrypt(
    args: &DecryptArgs,
    policy: &EncryptionPolicy,
    registry: &SchemaRegistry,
) -> Result<Value, CommandError> {
    let schema = match &args.schema {
        Some(path) => {
            let entity_type = args
                .entity_type
                .clone()
                .unwrap_or_else(|| schema_name_from_path(&path.to_string_lossy()).to_owned());
            Some(load_schema(registry, path, &entity_type)?)
        }
        None => None,
    };
    let input = read_input(args.input.as_deref())?;

    let output = decrypt_payload(&input, policy, schema.as_deref(), args.format.into())?;
    info!("decrypt finished");
    Ok(output)
}

/// Encrypt one entity object, or every entity in an array.
pub fn encrypt_payload(
    input: &Value,
    policy: &EncryptionPolicy,
    schema: &EntitySchema,
    format: JsonFormat,
) -> Result<Value, CommandError> {
    map_entities(input, |value| {
        let entity = wire::decode(value, Some(&|pk: &str, rk: &str, name: &str, raw: &str| {
            schema.resolve(pk, rk, name, raw)
        }))?;
        let encrypted = policy.encrypt(&entity, schema)?;
        Ok(wire::encode(&encrypted, format))
    })
}

/// Decrypt one entity object, or every entity in an array.
pub fn decrypt_payload(
    input: &Value,
    policy: &EncryptionPolicy,
    schema: Option<&EntitySchema>,
    format: JsonFormat,
) -> Result<Value, CommandError> {
    map_entities(input, |value| {
        let entity: DynamicEntity = match schema {
            Some(schema) => wire::decode(value, Some(&|pk: &str, rk: &str, name: &str, raw: &str| {
                schema.resolve(pk, rk, name, raw)
            }))?,
            None => wire::decode(value, None)?,
        };
        let decrypted = policy.decrypt(&entity, schema.map(|s| s as &dyn PropertyResolver))?;
        Ok(wire::encode(&decrypted, format))
    })
}

fn map_entities(
    input: &Value,
    mut f: impl FnMut(&Value) -> Result<Value, CommandError>,
) -> Result<Value, CommandError> {
    match input {
        Value::Array(items) => items.iter().map(&mut f).collect::<Result<Vec<_>, _>>().map(Value::Array),
        single => f(single),
    }
}

fn load_schema(
    registry: &SchemaRegistry,
    path: &Path,
    entity_type: &str,
) -> Result<std::sync::Arc<EntitySchema>, CommandError> {
    let text = fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })?;
    registry.load_document(&text)?;
    Ok(registry.get(entity_type)?)
}

fn read_input(path: Option<&Path>) -> Result<Value, CommandError> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?,
        None => io::read_to_string(io::stdin()).map_err(|source| CommandError::Io {
            path: "stdin".into(),
            source,
        })?,
    };
    Ok(serde_json::from_str(&text)?)
}
