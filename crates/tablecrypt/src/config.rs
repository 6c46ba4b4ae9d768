//! Engine settings loaded from the environment.
//!
//! Every value has a default, so an empty environment yields a usable (lenient)
//! configuration. Variables are prefixed `TABLECRYPT_`, e.g.
//! `TABLECRYPT_REQUIRE_ENCRYPTION=true`.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "TABLECRYPT";

/// Validated engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncryptionSettings {
    /// Strict mode: reject reads of entities that carry no encryption metadata.
    #[serde(default)]
    pub require_encryption: bool,

    /// Library name recorded in the metadata of every encrypted entity.
    #[serde(default = "default_encryption_library")]
    pub encryption_library: String,

    /// Whether the schema registry answers lookups.
    #[serde(default = "default_schema_registry_enabled")]
    pub schema_registry_enabled: bool,
}

pub(crate) fn default_encryption_library() -> String {
    format!("Rust tablecrypt {}", env!("CARGO_PKG_VERSION"))
}
fn default_schema_registry_enabled() -> bool {
    true
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            require_encryption: false,
            encryption_library: default_encryption_library(),
            schema_registry_enabled: default_schema_registry_enabled(),
        }
    }
}

impl EncryptionSettings {
    /// Load and validate settings from `TABLECRYPT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;
        Self::from_config(cfg)
    }

    /// Deserialise and validate settings from an already-built [`config::Config`].
    ///
    /// # Errors
    ///
    /// Returns an error if deserialisation or validation fails.
    pub fn from_config(cfg: config::Config) -> Result<Self> {
        let settings: EncryptionSettings = cfg
            .try_deserialize()
            .context("failed to deserialise encryption settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.encryption_library.trim().is_empty() {
            anyhow::bail!("{ENV_PREFIX}_ENCRYPTION_LIBRARY must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let settings = EncryptionSettings::default();
        assert!(!settings.require_encryption);
        assert!(settings.schema_registry_enabled);
        assert!(settings.encryption_library.starts_with("Rust tablecrypt "));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = config::Config::builder().build().unwrap();
        assert_eq!(EncryptionSettings::from_config(cfg).unwrap(), EncryptionSettings::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config::Config::builder()
            .set_override("require_encryption", true)
            .unwrap()
            .set_override("schema_registry_enabled", false)
            .unwrap()
            .set_override("encryption_library", "billing-svc")
            .unwrap()
            .build()
            .unwrap();
        let settings = EncryptionSettings::from_config(cfg).unwrap();
        assert!(settings.require_encryption);
        assert!(!settings.schema_registry_enabled);
        assert_eq!(settings.encryption_library, "billing-svc");
    }

    #[test]
    fn validate_rejects_blank_library() {
        let settings = EncryptionSettings {
            encryption_library: "  ".into(),
            ..EncryptionSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
