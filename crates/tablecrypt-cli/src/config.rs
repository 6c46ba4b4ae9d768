//! Configuration loading and validation for the `tablecrypt` tool.
//!
//! The key-encryption key never comes from the command line, so it stays out
//! of shell history and process listings.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use tablecrypt::config::ENV_PREFIX;
use tablecrypt::crypto::AesKeyWrap;
use tablecrypt::SymmetricKey;

/// Validated tool configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Id recorded with every wrapped content key (`TABLECRYPT_KEK_ID`).
    #[serde(default)]
    pub kek_id: Option<String>,

    /// Base64 key-encryption key, 16, 24 or 32 bytes (`TABLECRYPT_KEK_BASE64`).
    #[serde(default)]
    pub kek_base64: Option<String>,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("kek_id", &self.kek_id)
            .field("kek_base64", &self.kek_base64.as_ref().map(|_| "[REDACTED]"))
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from `TABLECRYPT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build tablecrypt configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise tablecrypt configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.parse::<tracing::Level>().is_err() {
            anyhow::bail!("{ENV_PREFIX}_LOG_LEVEL {:?} is not a log level", self.log_level);
        }
        match (&self.kek_id, &self.kek_base64) {
            (Some(id), Some(_)) if id.trim().is_empty() => {
                anyhow::bail!("{ENV_PREFIX}_KEK_ID must not be empty");
            }
            (Some(_), Some(_)) | (None, None) => {}
            _ => anyhow::bail!(
                "{ENV_PREFIX}_KEK_ID and {ENV_PREFIX}_KEK_BASE64 must be set together"
            ),
        }
        self.kek().map(|_| ())
    }

    /// The configured key-encryption key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64 or has a length the key
    /// wrap cannot use.
    pub fn kek(&self) -> Result<Option<SymmetricKey>> {
        let (Some(id), Some(encoded)) = (&self.kek_id, &self.kek_base64) else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .with_context(|| format!("{ENV_PREFIX}_KEK_BASE64 is not valid base64"))?;
        if AesKeyWrap::algorithm_for(bytes.len()).is_none() {
            anyhow::bail!(
                "{ENV_PREFIX}_KEK_BASE64 decodes to {} bytes; expected 16, 24 or 32",
                bytes.len()
            );
        }
        Ok(Some(SymmetricKey::new(id.clone(), bytes)))
    }
}
