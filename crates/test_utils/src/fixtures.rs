//! Pre-built Test Fixtures
//!
//! Fixed identifiers and values shared by the scenario tests, so that an
//! order, its products and their tags read the same in every crate.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{AccountId, EntityId, FeedId, FormId, ItemId, TagId};
use domain_sync::TagSet;

/// Fixture for plugin-side identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// Guest order purchasing products A and B
    pub fn order_501() -> EntityId {
        EntityId::new(501)
    }

    /// Guest order refunded after purchasing product A
    pub fn order_502() -> EntityId {
        EntityId::new(502)
    }

    pub fn product_a() -> ItemId {
        ItemId::new(10)
    }

    pub fn product_b() -> ItemId {
        ItemId::new(11)
    }

    /// Product without tag settings
    pub fn product_untagged() -> ItemId {
        ItemId::new(12)
    }

    pub fn customer() -> AccountId {
        AccountId::new(7)
    }

    pub fn form() -> FormId {
        FormId::new(3)
    }

    pub fn feed() -> FeedId {
        FeedId::new(1)
    }

    pub fn form_entry() -> EntityId {
        EntityId::new(900)
    }
}

/// Fixture for CRM tags
pub struct TagFixtures;

impl TagFixtures {
    pub fn t1() -> TagId {
        TagId::from("T1")
    }

    pub fn t2() -> TagId {
        TagId::from("T2")
    }

    /// The global purchase tag
    pub fn t3() -> TagId {
        TagId::from("T3")
    }

    /// Tags configured on product A
    pub fn product_a_tags() -> Vec<TagId> {
        vec![Self::t1(), Self::t2()]
    }

    /// Tags configured on product B
    pub fn product_b_tags() -> Vec<TagId> {
        vec![Self::t2()]
    }

    pub fn global() -> TagSet {
        [Self::t3()].into_iter().collect()
    }

    /// Builds a tag set from string ids
    pub fn set(ids: &[&str]) -> TagSet {
        ids.iter().map(|id| TagId::from(*id)).collect()
    }
}

/// Fixture for string data
pub struct StringFixtures;

impl StringFixtures {
    pub fn guest_email() -> &'static str {
        "guest@example.com"
    }

    pub fn customer_email() -> &'static str {
        "customer@example.com"
    }

    pub fn crm_name() -> &'static str {
        "Mock CRM"
    }
}

/// Fixture for timestamps
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn paid_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }
}
