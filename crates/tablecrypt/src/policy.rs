//! The encryption policy: encrypts entities on the write path and decrypts and
//! validates them on the read path.

use std::{borrow::Cow, fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{
    is_reserved, EncryptionAgent, EncryptionData, KeyWrappingMetadata, METADATA1, METADATA2,
};
use common::{DynamicEntity, EdmType, EntityProperty};
use tracing::{debug, warn};

use crate::config::{default_encryption_library, EncryptionSettings};
use crate::crypto::{cipher, AesKeyWrap, CipherError, IvScheme, KeyWrapAlgorithm};
use crate::error::EncryptionError;
use crate::keys::{ContentKey, KeyResolver, SymmetricKey};
use crate::manifest::{build_manifest, validate_manifest};
use crate::selector::{PropertyResolver, PropertySelector};

/// Holds the keys and switches used to encrypt and decrypt entities.
///
/// A policy is immutable once built and can be shared across threads. Every
/// call generates or unwraps its own content key; nothing is cached between
/// calls.
#[derive(Clone)]
pub struct EncryptionPolicy {
    key: Option<SymmetricKey>,
    key_resolver: Option<Arc<dyn KeyResolver>>,
    key_wrap: Arc<dyn KeyWrapAlgorithm>,
    require_encryption: bool,
    encryption_library: String,
}

impl fmt::Debug for EncryptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionPolicy")
            .field("key", &self.key)
            .field("key_resolver", &self.key_resolver.is_some())
            .field("key_wrap", &self.key_wrap)
            .field("require_encryption", &self.require_encryption)
            .field("encryption_library", &self.encryption_library)
            .finish()
    }
}

impl EncryptionPolicy {
    pub fn builder() -> EncryptionPolicyBuilder {
        EncryptionPolicyBuilder::default()
    }

    /// Whether strict mode is on.
    pub fn require_encryption(&self) -> bool {
        self.require_encryption
    }

    /// Encrypt the properties of `entity` chosen by `selector`.
    ///
    /// Returns a new entity in which each selected property holds binary
    /// ciphertext and the two metadata properties are attached. If the
    /// selector chooses nothing, a copy of `entity` is returned without
    /// metadata; in strict mode the metadata is still attached, with an empty
    /// manifest, so that a strict reader accepts the entity.
    ///
    /// # Errors
    ///
    /// - [`EncryptionError::ReservedPropertyName`] if `entity` already holds a
    ///   metadata property.
    /// - [`EncryptionError::MissingPolicy`] if no key-encryption key is set.
    /// - [`EncryptionError::InvalidOperand`] if a selected property is not a
    ///   non-null string. Checked before any key is generated.
    /// - [`EncryptionError::InvalidKeyLength`] if the key-encryption key
    ///   cannot be used by the wrap algorithm.
    pub fn encrypt(
        &self,
        entity: &DynamicEntity,
        selector: &dyn PropertySelector,
    ) -> Result<DynamicEntity, EncryptionError> {
        if let Some(name) = entity.properties.keys().find(|name| is_reserved(name)) {
            return Err(EncryptionError::ReservedPropertyName(name.clone()));
        }

        let kek = self.key.as_ref().ok_or_else(|| {
            EncryptionError::MissingPolicy(if self.require_encryption {
                "encryption is required but no key-encryption key is configured".to_owned()
            } else {
                "a key-encryption key is required to encrypt entities".to_owned()
            })
        })?;

        let (pk, rk) = (entity.partition_key.as_str(), entity.row_key.as_str());
        let selected = select_properties(entity, selector)?;
        if selected.is_empty() && !self.require_encryption {
            debug!(key_id = kek.key_id(), "no properties selected; entity left unencrypted");
            return Ok(entity.clone());
        }

        let cek = ContentKey::generate();
        let wrapped_content_key = self.key_wrap.wrap(&cek, kek)?;
        let scheme = IvScheme::random();

        let mut encrypted = entity.clone();
        for (name, value) in &selected {
            let iv = scheme.property_iv(pk, rk, name);
            let ciphertext = cipher::encrypt_property(value.as_bytes(), cek.as_bytes(), &iv)?;
            encrypted.insert(*name, EntityProperty::binary(ciphertext));
        }

        let manifest = build_manifest(selected.iter().map(|(name, _)| *name), pk, rk, &cek, &scheme)?;
        let metadata = EncryptionData {
            wrapped_content_key,
            encryption_agent: EncryptionAgent::current(),
            content_encryption_iv: scheme.content_iv().map(|iv| iv.to_vec()),
            key_wrapping_metadata: Some(KeyWrappingMetadata::for_library(
                self.encryption_library.as_str(),
            )),
        };
        let metadata_json = metadata.to_json().map_err(|e| {
            EncryptionError::InvalidMetadata(format!("failed to serialise {METADATA1}: {e}"))
        })?;
        encrypted.insert(METADATA1, EntityProperty::string(metadata_json));
        encrypted.insert(METADATA2, EntityProperty::binary(manifest));

        debug!(
            key_id = kek.key_id(),
            encrypted = selected.len(),
            scheme = scheme.name(),
            "entity encrypted"
        );
        Ok(encrypted)
    }

    /// Decrypt and validate `entity`.
    ///
    /// `resolver` restores the type of each decrypted value; without one every
    /// decrypted property comes back as a string. The metadata properties are
    /// removed from the result. On failure no partially decrypted entity is
    /// returned.
    ///
    /// An entity without metadata is returned unchanged, unless strict mode is
    /// on.
    ///
    /// # Errors
    ///
    /// - [`EncryptionError::EncryptionRequired`] in strict mode, for an entity
    ///   without metadata.
    /// - [`EncryptionError::InvalidMetadata`] for malformed or unsupported
    ///   metadata.
    /// - [`EncryptionError::MissingPolicy`] if neither a key resolver nor a key
    ///   is configured.
    /// - [`EncryptionError::KeyMismatch`] if the key cannot unwrap the content
    ///   key.
    /// - [`EncryptionError::DecryptionFailed`] if the manifest or a property
    ///   fails to decrypt, or the manifest names a property that carries no
    ///   ciphertext.
    /// - [`EncryptionError::InvalidPropertyValue`] if a decrypted value does
    ///   not parse as the type `resolver` chose.
    pub fn decrypt(
        &self,
        entity: &DynamicEntity,
        resolver: Option<&dyn PropertyResolver>,
    ) -> Result<DynamicEntity, EncryptionError> {
        let result = self.try_decrypt(entity, resolver);
        if let Err(e) = &result {
            warn!(code = e.code(), error = %e, "entity decryption rejected");
        }
        result
    }

    fn try_decrypt(
        &self,
        entity: &DynamicEntity,
        resolver: Option<&dyn PropertyResolver>,
    ) -> Result<DynamicEntity, EncryptionError> {
        let Some(raw_metadata) = entity.get(METADATA1) else {
            if entity.contains(METADATA2) {
                return Err(EncryptionError::InvalidMetadata(format!(
                    "{METADATA2} is present without {METADATA1}"
                )));
            }
            if self.require_encryption {
                return Err(EncryptionError::EncryptionRequired);
            }
            return Ok(entity.clone());
        };

        let metadata = parse_metadata(raw_metadata)?;
        let scheme = IvScheme::detect(&metadata)?;
        let kek = self.resolve_kek(&metadata.wrapped_content_key.key_id)?;
        let cek = self.key_wrap.unwrap(&metadata.wrapped_content_key, &kek)?;

        let (pk, rk) = (entity.partition_key.as_str(), entity.row_key.as_str());
        let manifest_bytes = entity
            .get(METADATA2)
            .ok_or_else(|| {
                EncryptionError::InvalidMetadata(format!("{METADATA1} is present without {METADATA2}"))
            })
            .and_then(|value| {
                ciphertext(value).ok_or_else(|| {
                    EncryptionError::InvalidMetadata(format!("{METADATA2} does not hold ciphertext"))
                })
            })?;
        let names = validate_manifest(&manifest_bytes, pk, rk, &cek, &scheme)?;

        let mut decrypted = entity.clone();
        decrypted.remove(METADATA1);
        decrypted.remove(METADATA2);
        for name in &names {
            if is_reserved(name) {
                return Err(EncryptionError::InvalidMetadata(format!(
                    "manifest names reserved property {name}"
                )));
            }
            let value = decrypt_one(entity, name, &cek, &scheme, resolver)?;
            decrypted.insert(name.as_str(), value);
        }

        debug!(
            key_id = kek.key_id(),
            decrypted = names.len(),
            scheme = scheme.name(),
            "entity decrypted"
        );
        Ok(decrypted)
    }

    /// Resolver first; the configured key otherwise. The key id itself is
    /// checked by the unwrap.
    fn resolve_kek(&self, key_id: &str) -> Result<SymmetricKey, EncryptionError> {
        if let Some(resolver) = &self.key_resolver {
            return resolver.resolve_key(key_id).ok_or_else(|| {
                EncryptionError::KeyMismatch(format!("no key found for key id {key_id:?}"))
            });
        }
        self.key.clone().ok_or_else(|| {
            EncryptionError::MissingPolicy(
                "a key resolver or key-encryption key is required to decrypt entities".to_owned(),
            )
        })
    }
}

/// Selected properties as `(name, plaintext)`, in name order.
fn select_properties<'a>(
    entity: &'a DynamicEntity,
    selector: &dyn PropertySelector,
) -> Result<Vec<(&'a str, &'a str)>, EncryptionError> {
    let mut selected = Vec::new();
    for (name, value) in &entity.properties {
        if !selector.should_encrypt(&entity.partition_key, &entity.row_key, name) {
            continue;
        }
        match value {
            EntityProperty::String(Some(text)) => selected.push((name.as_str(), text.as_str())),
            EntityProperty::String(None) => {
                return Err(EncryptionError::InvalidOperand(format!(
                    "property {name} is null; only non-null strings can be encrypted"
                )))
            }
            other => {
                return Err(EncryptionError::InvalidOperand(format!(
                    "property {name} is {}; only strings can be encrypted",
                    other.edm_type()
                )))
            }
        }
    }
    Ok(selected)
}

fn parse_metadata(value: &EntityProperty) -> Result<EncryptionData, EncryptionError> {
    let json = value.as_str().ok_or_else(|| {
        EncryptionError::InvalidMetadata(format!("{METADATA1} must be a non-null string"))
    })?;
    let metadata = EncryptionData::from_json(json)
        .map_err(|e| EncryptionError::InvalidMetadata(format!("{METADATA1} is malformed: {e}")))?;
    let agent = &metadata.encryption_agent;
    if !agent.is_supported() {
        return Err(EncryptionError::InvalidMetadata(format!(
            "unsupported encryption agent: protocol {} with {}",
            agent.protocol, agent.encryption_algorithm
        )));
    }
    Ok(metadata)
}

/// Ciphertext held by `value`: binary, or the base64 string a payload read
/// without type annotations yields.
fn ciphertext(value: &EntityProperty) -> Option<Cow<'_, [u8]>> {
    match value {
        EntityProperty::Binary(Some(bytes)) => Some(Cow::Borrowed(bytes.as_slice())),
        EntityProperty::String(Some(text)) => STANDARD.decode(text).ok().map(Cow::Owned),
        _ => None,
    }
}

fn decrypt_one(
    entity: &DynamicEntity,
    name: &str,
    cek: &ContentKey,
    scheme: &IvScheme,
    resolver: Option<&dyn PropertyResolver>,
) -> Result<EntityProperty, EncryptionError> {
    let context = || format!("property {name}");
    let bytes = entity
        .get(name)
        .and_then(ciphertext)
        .ok_or_else(|| EncryptionError::decryption(context(), CipherError::MissingCiphertext))?;

    let (pk, rk) = (entity.partition_key.as_str(), entity.row_key.as_str());
    let iv = scheme.property_iv(pk, rk, name);
    let plaintext = cipher::decrypt_property(&bytes, cek.as_bytes(), &iv)
        .map_err(|source| EncryptionError::decryption(context(), source))?;
    let text = String::from_utf8(plaintext)
        .map_err(|_| EncryptionError::decryption(context(), CipherError::MalformedPlaintext))?;

    let edm_type = resolver.map_or(EdmType::String, |r| r.resolve(pk, rk, name, &text));
    Ok(EntityProperty::parse(name, edm_type, &text)?)
}

/// Builder for [`EncryptionPolicy`].
#[derive(Default)]
pub struct EncryptionPolicyBuilder {
    key: Option<SymmetricKey>,
    key_resolver: Option<Arc<dyn KeyResolver>>,
    key_wrap: Option<Arc<dyn KeyWrapAlgorithm>>,
    require_encryption: bool,
    encryption_library: Option<String>,
}

impl EncryptionPolicyBuilder {
    /// Key-encryption key. Required to encrypt; used to decrypt when no
    /// resolver is set.
    pub fn key(mut self, key: SymmetricKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Resolver consulted on every decrypt, ahead of [`key`](Self::key).
    pub fn key_resolver(mut self, resolver: impl KeyResolver + 'static) -> Self {
        self.key_resolver = Some(Arc::new(resolver));
        self
    }

    /// Wrap algorithm. Defaults to [`AesKeyWrap`].
    pub fn key_wrap(mut self, algorithm: impl KeyWrapAlgorithm + 'static) -> Self {
        self.key_wrap = Some(Arc::new(algorithm));
        self
    }

    pub fn require_encryption(mut self, require: bool) -> Self {
        self.require_encryption = require;
        self
    }

    /// Library name recorded in the metadata of every encrypted entity.
    pub fn encryption_library(mut self, library: impl Into<String>) -> Self {
        self.encryption_library = Some(library.into());
        self
    }

    /// Apply strict mode and the library name from `settings`.
    pub fn settings(self, settings: &EncryptionSettings) -> Self {
        self.require_encryption(settings.require_encryption)
            .encryption_library(settings.encryption_library.clone())
    }

    pub fn build(self) -> EncryptionPolicy {
        EncryptionPolicy {
            key: self.key,
            key_resolver: self.key_resolver,
            key_wrap: self.key_wrap.unwrap_or_else(|| Arc::new(AesKeyWrap)),
            require_encryption: self.require_encryption,
            encryption_library: self.encryption_library.unwrap_or_else(default_encryption_library),
        }
    }
}
