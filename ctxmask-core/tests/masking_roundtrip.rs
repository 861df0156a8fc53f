//! Masking registry properties: stability, round trips and collisions.

use ctxmask_core::{ContextMasker, MaskCategory, MaskingConfig};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn identifiers() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{1,10}", 1..12)
}

proptest! {
    #[test]
    fn prop_single_category_round_trip(
        values in identifiers(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..30),
        separators in prop::collection::vec(
            prop::sample::select(vec![" ", ", ", " = ", "\n", "("]),
            30,
        ),
    ) {
        let values: Vec<String> = values.into_iter().collect();
        let mut masker = ContextMasker::new();
        for value in &values {
            masker.register(value, MaskCategory::Property);
        }

        let mut text = String::new();
        for (pick, separator) in picks.iter().zip(separators.iter()) {
            text.push_str(&values[pick.index(values.len())]);
            text.push_str(separator);
        }

        let masked = masker.mask_text(&text).unwrap();
        for word in masked.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
            prop_assert!(word.is_empty() || masker.is_mask(word), "leaked {:?}", word);
        }
        prop_assert_eq!(masker.unmask_text(&masked).unwrap(), text);
    }

    #[test]
    fn prop_register_is_stable(values in identifiers()) {
        let mut masker = ContextMasker::new();
        let first: Vec<String> = values
            .iter()
            .map(|v| masker.register(v, MaskCategory::Entity))
            .collect();
        let second: Vec<String> = values
            .iter()
            .map(|v| masker.register(v, MaskCategory::Entity))
            .collect();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(masker.len(), values.len());

        let distinct: BTreeSet<&String> = first.iter().collect();
        prop_assert_eq!(distinct.len(), values.len());
    }

    #[test]
    fn prop_restore_reproduces_registry(values in identifiers()) {
        let mut masker = ContextMasker::new();
        for (i, value) in values.iter().enumerate() {
            let category = if i % 2 == 0 { MaskCategory::Entity } else { MaskCategory::Table };
            masker.register(value, category);
        }

        let restored = ContextMasker::restore(MaskingConfig::default(), masker.entries().to_vec());
        prop_assert_eq!(restored.entries(), masker.entries());
        for entry in masker.entries() {
            prop_assert_eq!(restored.unmask_text(&entry.mask).unwrap(), entry.real.clone());
        }
    }
}

#[test]
fn test_counters_are_independent_per_category() {
    let mut masker = ContextMasker::new();
    assert_eq!(masker.register("Person", MaskCategory::Entity), "ENT_1");
    assert_eq!(masker.register("age", MaskCategory::Property), "P_1");
    assert_eq!(masker.register("Policy", MaskCategory::Entity), "ENT_2");
}

#[test]
fn test_same_value_different_categories() {
    let mut masker = ContextMasker::new();
    let as_property = masker.register("region", MaskCategory::Property);
    let as_parameter = masker.register("region", MaskCategory::Parameter);
    assert_ne!(as_property, as_parameter);

    // the flat slot keeps the higher-priority category
    assert_eq!(masker.mask_text("by region").unwrap(), "by P_1");
    // the colliding parameter mask still unmasks to the same text
    assert_eq!(masker.unmask_text("PARAM_1 and P_1").unwrap(), "region and region");
}

#[test]
fn test_longest_match_wins() {
    let mut masker = ContextMasker::new();
    masker.register("user", MaskCategory::Entity);
    masker.register("user_id", MaskCategory::Property);

    let masked = masker.mask_text("the user_id field of user").unwrap();
    assert_eq!(masked, "the P_1 field of ENT_1");
    assert!(!masked.contains("_id"));
}

#[test]
fn test_restored_registry_continues_numbering() {
    let mut masker = ContextMasker::new();
    masker.register("Person", MaskCategory::Entity);
    masker.register("Policy", MaskCategory::Entity);

    let mut restored = ContextMasker::restore(MaskingConfig::default(), masker.entries().to_vec());
    assert_eq!(restored.register("Claim", MaskCategory::Entity), "ENT_3");
    assert_eq!(restored.register("Person", MaskCategory::Entity), "ENT_1");
}
