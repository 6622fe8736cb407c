//! Source entities
//!
//! A source entity is the plugin-side record being synced: an order, a form
//! entry or a user. The sync engine only sees it through the narrow
//! [`SourceEntity`] capability trait; every integration provides its own
//! adapter type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, Attributes, EntityId, ItemId};

/// Kind of plugin record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    FormEntry,
    User,
}

impl EntityKind {
    /// Human-readable label used in audit notes and logs
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::FormEntry => "form entry",
            EntityKind::User => "user",
        }
    }
}

/// A purchased product on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn new(item_id: ItemId, quantity: u32) -> Self {
        Self {
            item_id,
            name: None,
            quantity,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Order-specific values synced as computed contact attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Display order number (may differ from the internal ID)
    pub number: String,
    pub total: Decimal,
    #[serde(default)]
    pub date_paid: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub coupon_codes: Vec<String>,
}

/// Capability interface the sync engine depends on
pub trait SourceEntity: Send + Sync {
    /// Entity identifier (post ID / entry ID / user ID)
    fn id(&self) -> EntityId;

    fn kind(&self) -> EntityKind;

    /// Email stored on the record, if the plugin has a dedicated one
    fn billing_email(&self) -> Option<String> {
        None
    }

    /// Linked site account, if the record belongs to a registered user
    fn account_id(&self) -> Option<AccountId> {
        None
    }

    /// Raw fields fed through the field mapping
    fn source_fields(&self) -> Attributes;

    fn line_items(&self) -> Vec<LineItem> {
        Vec::new()
    }

    fn customer_note(&self) -> Option<String> {
        None
    }

    /// Order values, for entities that represent a purchase
    fn order_summary(&self) -> Option<OrderSummary> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_defaults_quantity() {
        let item: LineItem = serde_json::from_str(r#"{"item_id": 10}"#).unwrap();
        assert_eq!(item.item_id, ItemId::new(10));
        assert_eq!(item.quantity, 1);
        assert!(item.name.is_none());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EntityKind::Order.label(), "order");
        assert_eq!(EntityKind::FormEntry.label(), "form entry");
        assert_eq!(serde_json::to_string(&EntityKind::FormEntry).unwrap(), "\"form_entry\"");
    }
}
