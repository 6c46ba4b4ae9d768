//! Altered, swapped, or transplanted ciphertext must never decrypt.

use common::protocol::{METADATA1, METADATA2};
use common::{DynamicEntity, EntityProperty};
use tablecrypt::crypto::CipherError;
use tablecrypt::{EncryptionError, EncryptionPolicy, PropertyNames, SymmetricKey};

fn policy() -> EncryptionPolicy {
    EncryptionPolicy::builder()
        .key(SymmetricKey::new("tamper-kek", vec![0x33u8; 32]))
        .build()
}

fn account(row_key: &str) -> DynamicEntity {
    DynamicEntity::new("accounts", row_key)
        .with_property("account_number", "GB29NWBK60161331926819")
        .with_property("email", "owner@example.com")
        .with_property("ssn", "219-09-9999")
        .with_property("branch", "north")
}

fn selector() -> PropertyNames {
    PropertyNames::new(["account_number", "email", "ssn"])
}

fn binary_mut<'a>(entity: &'a mut DynamicEntity, name: &str) -> &'a mut Vec<u8> {
    match entity.properties.get_mut(name) {
        Some(EntityProperty::Binary(Some(bytes))) => bytes,
        other => panic!("{name} is not binary: {other:?}"),
    }
}

#[test]
fn flipped_property_byte_breaks_padding() {
    let mut encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    // 22-byte value: two blocks. Flipping the last byte of the first block
    // flips the final padding byte of the second.
    let bytes = binary_mut(&mut encrypted, "account_number");
    assert_eq!(bytes.len(), 32);
    bytes[15] ^= 0x01;

    let err = policy().decrypt(&encrypted, None).unwrap_err();
    assert!(matches!(
        err,
        EncryptionError::DecryptionFailed { ref context, source: CipherError::Padding }
            if context.contains("account_number")
    ));
}

#[test]
fn flipped_manifest_byte_breaks_padding() {
    let mut encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    // ["account_number","email","ssn"] is exactly two blocks, so the padding
    // fills the third.
    let bytes = binary_mut(&mut encrypted, METADATA2);
    assert_eq!(bytes.len(), 48);
    bytes[31] ^= 0x01;

    let err = policy().decrypt(&encrypted, None).unwrap_err();
    assert!(matches!(
        err,
        EncryptionError::DecryptionFailed { source: CipherError::Padding, .. }
    ));
}

#[test]
fn truncated_ciphertext_rejected() {
    let mut encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    binary_mut(&mut encrypted, "email").truncate(7);
    let err = policy().decrypt(&encrypted, None).unwrap_err();
    assert!(matches!(
        err,
        EncryptionError::DecryptionFailed { source: CipherError::InvalidLength(7), .. }
    ));
}

#[test]
fn swapped_properties_within_an_entity_rejected() {
    let mut encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    let ssn = encrypted.remove("ssn").unwrap();
    let email = encrypted.remove("email").unwrap();
    encrypted.insert("ssn", email);
    encrypted.insert("email", ssn);

    let err = policy().decrypt(&encrypted, None).unwrap_err();
    assert!(matches!(err, EncryptionError::DecryptionFailed { .. }));
}

#[test]
fn payload_transplanted_onto_another_row_rejected() {
    let source = policy().encrypt(&account("a-1"), &selector()).unwrap();
    let mut target = source.clone();
    target.row_key = "a-2".into();

    let err = policy().decrypt(&target, None).unwrap_err();
    assert!(
        matches!(err, EncryptionError::DecryptionFailed { ref context, .. } if context.contains("manifest")),
        "{err:?}"
    );
}

#[test]
fn payload_transplanted_onto_another_partition_rejected() {
    let source = policy().encrypt(&account("a-1"), &selector()).unwrap();
    let mut target = source.clone();
    target.partition_key = "other-accounts".into();
    assert!(policy().decrypt(&target, None).unwrap_err().is_authentication_failure());
}

#[test]
fn payload_moved_across_the_key_boundary_rejected() {
    // ("tenant", "a-1") and ("tenanta", "-1") join to the same string.
    let source = DynamicEntity::new("tenant", "a-1").with_property("ssn", "219-09-9999");
    let encrypted = policy().encrypt(&source, &PropertyNames::new(["ssn"])).unwrap();

    let mut target = encrypted.clone();
    target.partition_key = "tenanta".into();
    target.row_key = "-1".into();
    assert!(policy().decrypt(&target, None).unwrap_err().is_authentication_failure());

    assert_eq!(
        policy().decrypt(&encrypted, None).unwrap().get("ssn"),
        Some(&EntityProperty::string("219-09-9999"))
    );
}

#[test]
fn metadata_from_another_entity_rejected() {
    let a = policy().encrypt(&account("a-1"), &selector()).unwrap();
    let mut b = policy().encrypt(&account("a-1"), &selector()).unwrap();
    // Same identity, but b's manifest and properties were encrypted under a
    // different content key.
    b.insert(METADATA1, a.get(METADATA1).unwrap().clone());
    assert!(policy().decrypt(&b, None).unwrap_err().is_authentication_failure());
}

#[test]
fn wrong_key_bytes_under_same_id_rejected() {
    let encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    let impostor = EncryptionPolicy::builder()
        .key(SymmetricKey::new("tamper-kek", vec![0x34u8; 32]))
        .build();
    assert!(matches!(
        impostor.decrypt(&encrypted, None),
        Err(EncryptionError::KeyMismatch(_))
    ));
}

#[test]
fn ciphertext_replaced_by_plaintext_rejected() {
    let mut encrypted = policy().encrypt(&account("a-1"), &selector()).unwrap();
    encrypted.insert("ssn", "219-09-9999");
    let err = policy().decrypt(&encrypted, None).unwrap_err();
    assert!(matches!(
        err,
        EncryptionError::DecryptionFailed { source: CipherError::MissingCiphertext, .. }
    ));
}
