use std::collections::BTreeMap;

use common::{DynamicEntity, EntityProperty};
use proptest::prelude::*;
use tablecrypt::{EncryptionPolicy, PropertyNames, SymmetricKey};

fn policy() -> EncryptionPolicy {
    EncryptionPolicy::builder()
        .key(SymmetricKey::new("prop-kek", vec![0x21u8; 32]))
        .build()
}

fn entity_strategy() -> impl Strategy<Value = (DynamicEntity, Vec<String>)> {
    (
        "\\PC{0,24}",
        "\\PC{0,24}",
        prop::collection::btree_map("[a-z][a-z0-9_]{0,11}", "\\PC{0,40}", 1..6),
        any::<prop::sample::Index>(),
    )
        .prop_map(|(pk, rk, values, pick): (String, String, BTreeMap<String, String>, _)| {
            let names: Vec<String> = values.keys().cloned().collect();
            // A non-empty prefix of the names is selected.
            let selected = names[..=pick.index(names.len())].to_vec();
            let mut entity = DynamicEntity::new(pk, rk);
            for (name, value) in values {
                entity.insert(name, value);
            }
            (entity, selected)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encrypt_then_decrypt_is_identity((entity, selected) in entity_strategy()) {
        let policy = policy();
        let encrypted = policy.encrypt(&entity, &PropertyNames::new(selected.iter())).unwrap();
        for name in &selected {
            prop_assert!(encrypted.get(name).and_then(EntityProperty::as_binary).is_some());
        }
        prop_assert_eq!(policy.decrypt(&encrypted, None).unwrap(), entity);
    }

    #[test]
    fn ciphertexts_never_repeat((entity, selected) in entity_strategy()) {
        let policy = policy();
        let selector = PropertyNames::new(selected.iter());
        let a = policy.encrypt(&entity, &selector).unwrap();
        let b = policy.encrypt(&entity, &selector).unwrap();
        for name in &selected {
            prop_assert_ne!(a.get(name), b.get(name));
        }
    }
}
