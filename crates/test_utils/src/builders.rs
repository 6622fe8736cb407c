//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{DateTime, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, Attributes, EntityId, FeedId, FieldValue, FormId, ItemId, TagId};
use domain_integrations::{FeedSettings, FieldMapSetting, FormEntry, Order};
use domain_sync::{EventPayload, FieldType, LineItem, SyncEvent};

use crate::fixtures::{IdFixtures, TemporalFixtures};

/// Builder for constructing test orders
pub struct OrderBuilder {
    id: EntityId,
    customer_id: Option<AccountId>,
    billing: Attributes,
    items: Vec<LineItem>,
    total: Decimal,
    date_paid: Option<DateTime<Utc>>,
    payment_method_title: Option<String>,
    customer_note: Option<String>,
    coupon_codes: Vec<String>,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBuilder {
    /// Creates a guest order with a generated billing name and email
    pub fn new() -> Self {
        let email: String = SafeEmail().fake();
        let first_name: String = FirstName().fake();
        let last_name: String = LastName().fake();

        let billing = [
            ("billing_email", email),
            ("billing_first_name", first_name),
            ("billing_last_name", last_name),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), FieldValue::text(v)))
        .collect();

        Self {
            id: IdFixtures::order_501(),
            customer_id: None,
            billing,
            items: Vec::new(),
            total: dec!(49.99),
            date_paid: Some(TemporalFixtures::paid_at()),
            payment_method_title: Some("Credit Card".to_string()),
            customer_note: None,
            coupon_codes: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Makes the order belong to a registered customer
    pub fn with_customer(mut self, account_id: AccountId) -> Self {
        self.customer_id = Some(account_id);
        self
    }

    pub fn with_billing_email(self, email: impl Into<String>) -> Self {
        self.with_billing_field("billing_email", email.into())
    }

    /// Removes the billing email entirely
    pub fn without_billing_email(mut self) -> Self {
        self.billing.remove("billing_email");
        self
    }

    pub fn with_billing_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.billing.insert(key.into(), value.into());
        self
    }

    pub fn with_item(mut self, item_id: ItemId) -> Self {
        self.items.push(LineItem::new(item_id, 1));
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    pub fn with_customer_note(mut self, note: impl Into<String>) -> Self {
        self.customer_note = Some(note.into());
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_codes.push(code.into());
        self
    }

    pub fn unpaid(mut self) -> Self {
        self.date_paid = None;
        self
    }

    pub fn build(self) -> Order {
        Order {
            id: self.id,
            number: self.id.to_string(),
            customer_id: self.customer_id,
            billing: self.billing,
            items: self.items,
            total: self.total,
            date_paid: self.date_paid,
            payment_method_title: self.payment_method_title,
            customer_note: self.customer_note,
            coupon_codes: self.coupon_codes,
        }
    }
}

/// Builder for form feed settings
#[derive(Default)]
pub struct FeedSettingsBuilder {
    settings: FeedSettings,
}

impl FeedSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a form field to a CRM field
    pub fn map(mut self, field_id: &str, crm_field: &str, field_type: FieldType) -> Self {
        self.settings.fields_map.insert(
            field_id.to_string(),
            FieldMapSetting {
                crm_field: Some(crm_field.to_string()),
                field_type: Some(field_type),
            },
        );
        self
    }

    pub fn apply_tag(mut self, tag: TagId) -> Self {
        self.settings.apply_tags.insert(tag);
        self
    }

    pub fn add_only(mut self) -> Self {
        self.settings.add_only = true;
        self
    }

    pub fn build(self) -> FeedSettings {
        self.settings
    }
}

/// Builder for form submissions
pub struct FormSubmissionBuilder {
    entry_id: EntityId,
    form_id: FormId,
    feed_id: FeedId,
    account_id: Option<AccountId>,
    fields: Attributes,
}

impl Default for FormSubmissionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSubmissionBuilder {
    pub fn new() -> Self {
        Self {
            entry_id: IdFixtures::form_entry(),
            form_id: IdFixtures::form(),
            feed_id: IdFixtures::feed(),
            account_id: None,
            fields: Attributes::new(),
        }
    }

    pub fn with_entry_id(mut self, id: EntityId) -> Self {
        self.entry_id = id;
        self
    }

    pub fn with_feed(mut self, feed_id: FeedId) -> Self {
        self.feed_id = feed_id;
        self
    }

    pub fn with_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn field(mut self, field_id: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field_id.to_string(), value.into());
        self
    }

    /// Submits a generated email under the given field id
    pub fn with_generated_email(self, field_id: &str) -> Self {
        let email: String = SafeEmail().fake();
        self.field(field_id, email)
    }

    pub fn build_entry(self) -> FormEntry {
        FormEntry {
            id: self.entry_id,
            form_id: self.form_id,
            feed_id: self.feed_id,
            account_id: self.account_id,
            fields: self.fields,
        }
    }

    pub fn build_event(self) -> SyncEvent {
        SyncEvent::new(EventPayload::FormSubmitted {
            form_id: self.form_id,
            feed_id: self.feed_id,
            entry_id: self.entry_id,
            account_id: self.account_id,
            fields: self.fields,
        })
    }
}
