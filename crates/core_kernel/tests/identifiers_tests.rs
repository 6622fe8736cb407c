//! Unit tests for the Identifiers module
//!
//! Tests cover numeric plugin-side identifiers, string CRM-side identifiers,
//! their parsing, ordering and serde representation.

use core_kernel::{AccountId, ContactId, EntityId, FeedId, FormId, ItemId, TagId};
use proptest::prelude::*;
use std::collections::BTreeSet;

mod numeric_id_tests {
    use super::*;

    #[test]
    fn test_prefixes_are_distinct() {
        let prefixes: BTreeSet<&str> = [
            EntityId::prefix(),
            AccountId::prefix(),
            ItemId::prefix(),
            FormId::prefix(),
            FeedId::prefix(),
        ]
        .into_iter()
        .collect();
        assert_eq!(prefixes.len(), 5);
    }

    #[test]
    fn test_ordering_follows_raw_value() {
        let mut ids = vec![EntityId::new(503), EntityId::new(501), EntityId::new(502)];
        ids.sort();
        assert_eq!(ids, vec![EntityId::new(501), EntityId::new(502), EntityId::new(503)]);
    }

    #[test]
    fn test_conversions() {
        let id: ItemId = 10u64.into();
        assert_eq!(id.get(), 10);
        let raw: u64 = id.into();
        assert_eq!(raw, 10);
    }

    #[test]
    fn test_parse_rejects_foreign_prefix() {
        assert!("USR-7".parse::<EntityId>().is_err());
        assert_eq!("USR-7".parse::<AccountId>().unwrap(), AccountId::new(7));
    }

    #[test]
    fn test_serde_is_a_bare_number() {
        let json = serde_json::to_string(&FormId::new(12)).unwrap();
        assert_eq!(json, "12");
        let back: FormId = serde_json::from_str("12").unwrap();
        assert_eq!(back, FormId::new(12));
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(raw in any::<u64>()) {
            let id = EntityId::new(raw);
            prop_assert_eq!(id.to_string().parse::<EntityId>().unwrap(), id);
        }
    }
}

mod string_id_tests {
    use super::*;

    #[test]
    fn test_contact_id_roundtrips_raw_value() {
        let contact = ContactId::new("0035e00000AbCdE");
        assert_eq!(contact.as_str(), "0035e00000AbCdE");
        assert_eq!(contact.to_string(), "0035e00000AbCdE");
    }

    #[test]
    fn test_tag_ids_dedupe_in_sets() {
        let tags: BTreeSet<TagId> = ["T1", "T2", "T1"].into_iter().map(TagId::from).collect();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_whitespace_tag_is_invalid() {
        assert!(!TagId::from("\t").is_valid());
        assert!(TagId::from(" VIP ").is_valid());
    }
}
