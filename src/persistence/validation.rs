//! Value filtering applied before every write
//!
//! Old saves contain `null`, `"undefined"` and blank strings for fields the
//! user never touched. None of those may reach storage again.

use crate::form::{FieldMap, FieldValue};

/// True for values worth persisting
pub fn is_valid_value(value: &FieldValue) -> bool {
    value.is_meaningful()
}

/// Drop every absent, sentinel, empty or whitespace-only entry
pub fn filter_invalid(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(_, v)| is_valid_value(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// True when at least one entry would survive `filter_invalid`
pub fn has_valid_values(fields: &FieldMap) -> bool {
    fields.values().any(is_valid_value)
}

/// True when any entry is a sentinel or `null` (the mark of a corrupted save)
pub fn has_sentinels(fields: &FieldMap) -> bool {
    fields.values().any(|v| match v {
        FieldValue::Absent => true,
        FieldValue::Text(s) => s == crate::form::UNDEFINED_SENTINEL,
        FieldValue::Flag(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            Just(FieldValue::Absent),
            Just(FieldValue::from("undefined")),
            Just(FieldValue::from("")),
            "[ \t]{1,4}".prop_map(FieldValue::Text),
            "[a-zA-Z0-9 @.+-]{1,12}".prop_map(FieldValue::Text),
            any::<bool>().prop_map(FieldValue::Flag),
        ]
    }

    fn arb_fields() -> impl Strategy<Value = FieldMap> {
        prop::collection::btree_map("[a-z]{1,8}", arb_value(), 0..12)
    }

    proptest! {
        #[test]
        fn filter_is_idempotent(fields in arb_fields()) {
            let once = filter_invalid(&fields);
            prop_assert_eq!(filter_invalid(&once), once);
        }

        #[test]
        fn filter_keeps_only_meaningful(fields in arb_fields()) {
            let filtered = filter_invalid(&fields);
            prop_assert!(filtered.values().all(FieldValue::is_meaningful));
            prop_assert!(!has_sentinels(&filtered));
            prop_assert_eq!(has_valid_values(&fields), !filtered.is_empty());
        }
    }

    #[test]
    fn test_filter_examples() {
        let mut fields = FieldMap::new();
        fields.insert("a".into(), FieldValue::from("Ana"));
        fields.insert("b".into(), FieldValue::from("undefined"));
        fields.insert("c".into(), FieldValue::Absent);
        fields.insert("d".into(), FieldValue::from("   "));
        fields.insert("e".into(), FieldValue::Flag(true));

        let filtered = filter_invalid(&fields);
        assert_eq!(filtered.keys().collect::<Vec<_>>(), vec!["a", "e"]);
        assert!(has_sentinels(&fields));
    }
}
