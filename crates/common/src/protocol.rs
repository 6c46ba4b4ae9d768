//! Encryption metadata stored alongside encrypted entities.
//!
//! Encrypted entities carry two reserved properties:
//!
//! - [`METADATA1`]: a JSON string holding [`EncryptionData`] (wrapped content
//!   key, agent, IV, and key-wrapping metadata).
//! - [`METADATA2`]: binary ciphertext of the sorted list of encrypted property
//!   names.
//!
//! Field names are PascalCase on the wire so that entities written by other
//! table clients parse unchanged.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Reserved property holding the serialised [`EncryptionData`].
pub const METADATA1: &str = "_ClientEncryptionMetadata1";

/// Reserved property holding the encrypted property-name manifest.
pub const METADATA2: &str = "_ClientEncryptionMetadata2";

/// Encryption protocol version written by this library.
pub const PROTOCOL_V1: &str = "1.0";

/// Content encryption algorithm identifier.
pub const AES_CBC_256: &str = "AES_CBC_256";

/// Key of the [`KeyWrappingMetadata`] entry naming the writing library.
pub const ENCRYPTION_LIBRARY: &str = "EncryptionLibrary";

/// Returns `true` if `name` is one of the two reserved metadata properties.
pub fn is_reserved(name: &str) -> bool {
    name == METADATA1 || name == METADATA2
}

// ---------------------------------------------------------------------------
// Metadata1
// ---------------------------------------------------------------------------

/// Contents of the [`METADATA1`] property.
///
/// `content_encryption_iv` and `key_wrapping_metadata` are optional because
/// older writers omit them; their presence selects the IV derivation scheme
/// used to read the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionData {
    pub wrapped_content_key: WrappedContentKey,
    pub encryption_agent: EncryptionAgent,
    #[serde(
        rename = "ContentEncryptionIV",
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_opt"
    )]
    pub content_encryption_iv: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_wrapping_metadata: Option<KeyWrappingMetadata>,
}

impl EncryptionData {
    /// Serialise to the JSON string stored in [`METADATA1`].
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the JSON string stored in [`METADATA1`].
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// The content key wrapped under a key-encryption key.
///
/// This is the only persisted form of the content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WrappedContentKey {
    /// Id of the key-encryption key that wrapped this content key.
    pub key_id: String,
    /// Opaque wrapped key bytes (base64 on the wire).
    #[serde(with = "base64_bytes")]
    pub encrypted_key: Vec<u8>,
    /// Key-wrap algorithm name, e.g. `"A256KW"`.
    pub algorithm: String,
}

/// Identifies the protocol and content algorithm used by the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionAgent {
    pub protocol: String,
    pub encryption_algorithm: String,
}

impl EncryptionAgent {
    /// The agent this library writes.
    pub fn current() -> Self {
        Self {
            protocol: PROTOCOL_V1.into(),
            encryption_algorithm: AES_CBC_256.into(),
        }
    }

    /// Returns `true` if this library can read data written by the agent.
    pub fn is_supported(&self) -> bool {
        self.protocol == PROTOCOL_V1 && self.encryption_algorithm == AES_CBC_256
    }
}

/// Free-form string metadata recorded by the writer, e.g. its library name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyWrappingMetadata(pub BTreeMap<String, String>);

impl KeyWrappingMetadata {
    /// Metadata naming the writing library.
    pub fn for_library(library: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(ENCRYPTION_LIBRARY.to_owned(), library.into());
        Self(map)
    }

    pub fn encryption_library(&self) -> Option<&str> {
        self.0.get(ENCRYPTION_LIBRARY).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// base64 helpers
// ---------------------------------------------------------------------------

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod base64_opt {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptionData {
        EncryptionData {
            wrapped_content_key: WrappedContentKey {
                key_id: "kek-1".into(),
                encrypted_key: vec![0xAB; 40],
                algorithm: "A256KW".into(),
            },
            encryption_agent: EncryptionAgent::current(),
            content_encryption_iv: Some(vec![7u8; 16]),
            key_wrapping_metadata: Some(KeyWrappingMetadata::for_library("Rust tablecrypt")),
        }
    }

    #[test]
    fn wire_field_names_are_pascal_case() {
        let json = sample().to_json().unwrap();
        for field in [
            "\"WrappedContentKey\"",
            "\"KeyId\"",
            "\"EncryptedKey\"",
            "\"Algorithm\"",
            "\"EncryptionAgent\"",
            "\"Protocol\"",
            "\"EncryptionAlgorithm\"",
            "\"ContentEncryptionIV\"",
            "\"KeyWrappingMetadata\"",
            "\"EncryptionLibrary\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn parses_legacy_shape_without_iv_or_wrapping_metadata() {
        let json = r#"{
            "WrappedContentKey": {"KeyId": "k", "EncryptedKey": "AAAA", "Algorithm": "A256KW"},
            "EncryptionAgent": {"Protocol": "1.0", "EncryptionAlgorithm": "AES_CBC_256"}
        }"#;
        let data = EncryptionData::from_json(json).unwrap();
        assert_eq!(data.content_encryption_iv, None);
        assert_eq!(data.key_wrapping_metadata, None);
        assert!(data.encryption_agent.is_supported());
        // Absent optional fields stay absent when re-serialised.
        assert!(!data.to_json().unwrap().contains("ContentEncryptionIV"));
    }

    #[test]
    fn rejects_bad_base64_key() {
        let json = r#"{
            "WrappedContentKey": {"KeyId": "k", "EncryptedKey": "!!", "Algorithm": "A256KW"},
            "EncryptionAgent": {"Protocol": "1.0", "EncryptionAlgorithm": "AES_CBC_256"}
        }"#;
        assert!(EncryptionData::from_json(json).is_err());
    }

    #[test]
    fn unsupported_agent_detected() {
        let agent = EncryptionAgent {
            protocol: "2.0".into(),
            encryption_algorithm: AES_CBC_256.into(),
        };
        assert!(!agent.is_supported());
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved(METADATA1));
        assert!(is_reserved(METADATA2));
        assert!(!is_reserved("metadata1"));
    }
}
