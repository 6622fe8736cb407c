//! Contact records
//!
//! A [`ContactRecord`] is the unit handed to the CRM: who the contact is, the
//! canonical attributes to push and the resolved tag set.

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, Attributes, FieldValue};

use crate::entity::OrderSummary;
use crate::tags::TagSet;

/// Key used to find or create the CRM contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Identity {
    /// A registered site account with (possibly) a linked contact
    Account {
        account_id: AccountId,
        email: Option<String>,
    },
    /// A guest identified only by email address
    Email(String),
}

impl Identity {
    /// Resolves the identity, preferring the account over the email
    ///
    /// Blank emails count as absent.
    pub fn resolve(account_id: Option<AccountId>, email: Option<String>) -> Option<Self> {
        let email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        match (account_id, email) {
            (Some(account_id), email) => Some(Identity::Account { account_id, email }),
            (None, Some(email)) => Some(Identity::Email(email)),
            (None, None) => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Account { email, .. } => email.as_deref(),
            Identity::Email(email) => Some(email),
        }
    }

    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            Identity::Account { account_id, .. } => Some(*account_id),
            Identity::Email(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Account { account_id, .. } => write!(f, "user #{}", account_id),
            Identity::Email(email) => f.write_str(email),
        }
    }
}

/// Canonical attributes plus resolved tags for one contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub identity: Identity,
    pub attributes: Attributes,
    pub tags: TagSet,
}

impl ContactRecord {
    pub fn new(identity: Identity, attributes: Attributes) -> Self {
        Self {
            identity,
            attributes,
            tags: TagSet::new(),
        }
    }
}

/// Computed attributes for purchase events
///
/// Adds `order_date`, `order_total`, `order_id`, `order_payment_method`,
/// `coupon_code` (first coupon only) and `order_notes` when present.
pub fn order_attributes(summary: &OrderSummary, customer_note: Option<&str>) -> Attributes {
    let mut attributes = Attributes::new();

    if let Some(paid) = summary.date_paid {
        attributes.insert("order_date".into(), FieldValue::text(paid.to_rfc3339()));
    }
    attributes.insert("order_total".into(), FieldValue::Decimal(summary.total.round_dp(2)));
    attributes.insert("order_id".into(), FieldValue::text(summary.number.clone()));

    if let Some(note) = customer_note.filter(|n| !n.trim().is_empty()) {
        attributes.insert("order_notes".into(), FieldValue::text(note));
    }
    if let Some(method) = summary.payment_method.as_deref().filter(|m| !m.is_empty()) {
        attributes.insert("order_payment_method".into(), FieldValue::text(method));
    }
    if let Some(coupon) = summary.coupon_codes.first() {
        attributes.insert("coupon_code".into(), FieldValue::text(coupon.clone()));
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_identity_prefers_account() {
        let identity = Identity::resolve(Some(AccountId::new(7)), Some("a@example.com".into())).unwrap();
        assert_eq!(identity.account_id(), Some(AccountId::new(7)));
        assert_eq!(identity.email(), Some("a@example.com"));
    }

    #[test]
    fn test_identity_blank_email_is_absent() {
        assert!(Identity::resolve(None, Some("   ".into())).is_none());
        assert!(Identity::resolve(None, None).is_none());
        assert_eq!(
            Identity::resolve(None, Some(" a@example.com ".into())),
            Some(Identity::Email("a@example.com".into()))
        );
    }

    #[test]
    fn test_order_attributes() {
        let summary = OrderSummary {
            number: "501".into(),
            total: dec!(49.999),
            date_paid: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            payment_method: Some("Credit Card".into()),
            coupon_codes: vec!["SPRING".into(), "VIP".into()],
        };
        let attributes = order_attributes(&summary, Some("Leave at door"));

        assert_eq!(attributes.get("order_id"), Some(&FieldValue::text("501")));
        assert_eq!(attributes.get("order_total"), Some(&FieldValue::Decimal(dec!(50.00))));
        assert_eq!(attributes.get("coupon_code"), Some(&FieldValue::text("SPRING")));
        assert_eq!(attributes.get("order_notes"), Some(&FieldValue::text("Leave at door")));
        assert_eq!(
            attributes.get("order_date"),
            Some(&FieldValue::text("2024-05-01T12:00:00+00:00"))
        );
    }

    #[test]
    fn test_order_attributes_skip_absent_values() {
        let summary = OrderSummary {
            number: "9".into(),
            total: dec!(0),
            date_paid: None,
            payment_method: None,
            coupon_codes: vec![],
        };
        let attributes = order_attributes(&summary, Some("  "));

        assert!(!attributes.contains_key("order_date"));
        assert!(!attributes.contains_key("order_notes"));
        assert!(!attributes.contains_key("coupon_code"));
        assert_eq!(attributes.get("order_total"), Some(&FieldValue::Decimal(dec!(0))));
    }
}
