//! Ecommerce integration
//!
//! Syncs the customer of a completed order to the CRM, applies the global
//! purchase tags plus the tags configured on each purchased product, and
//! removes the product tags again when the order is refunded. Orders that
//! were never synced can be backfilled through the export screen.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{AccountId, Attributes, EntityId};
use domain_sync::{
    BatchReconciler, ConfigProvider, ContactSyncEngine, EntityKind, EventKind, EventPayload,
    FieldDescriptor, FieldGroup, FieldMapping, FieldType, LineItem, OrderSummary, SourceEntity,
    SyncError, SyncEvent,
};

use crate::integration::{HandleOutcome, Integration};
use crate::settings::{ExportOption, SettingDescriptor, SettingKind};

pub const SLUG: &str = "my-ecommerce-plugin";
pub const NAME: &str = "My Ecommerce Plugin";

/// Key of the orders batch operation
pub const EXPORT_KEY: &str = "example_ecommerce";

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::OrderCompleted, EventKind::OrderRefunded];

/// A plugin order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    /// Display order number
    pub number: String,
    /// Registered customer, `None` for guest checkouts
    #[serde(default)]
    pub customer_id: Option<AccountId>,
    /// Billing fields keyed by the plugin's meta keys (`billing_email`, ...)
    #[serde(default)]
    pub billing: Attributes,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(default)]
    pub date_paid: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method_title: Option<String>,
    #[serde(default)]
    pub customer_note: Option<String>,
    #[serde(default)]
    pub coupon_codes: Vec<String>,
}

impl SourceEntity for Order {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Order
    }

    fn billing_email(&self) -> Option<String> {
        self.billing
            .get("billing_email")
            .and_then(|v| v.as_text())
            .map(str::to_string)
    }

    fn account_id(&self) -> Option<AccountId> {
        self.customer_id
    }

    fn source_fields(&self) -> Attributes {
        self.billing.clone()
    }

    fn line_items(&self) -> Vec<LineItem> {
        self.items.clone()
    }

    fn customer_note(&self) -> Option<String> {
        self.customer_note.clone()
    }

    fn order_summary(&self) -> Option<OrderSummary> {
        Some(OrderSummary {
            number: self.number.clone(),
            total: self.total,
            date_paid: self.date_paid,
            payment_method: self.payment_method_title.clone(),
            coupon_codes: self.coupon_codes.clone(),
        })
    }
}

/// Billing fields to contact fields
pub fn billing_field_mapping() -> FieldMapping {
    FieldMapping::new()
        .map_typed("billing_email", "user_email", FieldType::Email)
        .map_typed("billing_first_name", "first_name", FieldType::Text)
        .map_typed("billing_last_name", "last_name", FieldType::Text)
        .map_typed("billing_phone", "phone_number", FieldType::Phone)
        .map("billing_company", "billing_company")
        .map("billing_address_1", "billing_address_1")
        .map("billing_address_2", "billing_address_2")
        .map("billing_city", "billing_city")
        .map("billing_state", "billing_state")
        .map("billing_postcode", "billing_postcode")
        .map("billing_country", "billing_country")
}

/// Fields shared by the integrations' field groups
pub(crate) fn plugin_meta_fields(group: &str) -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("meta_field_key", "Meta field name", FieldType::Text, group),
        FieldDescriptor::new("pseudo_field_key", "Pseudo field name", FieldType::Text, group).pseudo(),
    ]
}

/// The ecommerce plugin integration
#[derive(Clone)]
pub struct EcommerceIntegration {
    engine: ContactSyncEngine<Order>,
    reconciler: BatchReconciler<Order>,
    mapping: FieldMapping,
    config: Arc<dyn ConfigProvider>,
}

impl EcommerceIntegration {
    pub fn new(engine: ContactSyncEngine<Order>, config: Arc<dyn ConfigProvider>) -> Self {
        let mapping = billing_field_mapping();
        Self {
            reconciler: BatchReconciler::new(engine.clone(), mapping.clone()),
            engine,
            mapping,
            config,
        }
    }

    /// Syncs the customer of a completed order
    #[instrument(skip(self), fields(integration = SLUG))]
    pub async fn process_order(&self, order_id: EntityId) -> Result<HandleOutcome, SyncError> {
        let order = self.engine.store().get(order_id).await?;
        let config = self.config.sync_config(SLUG);
        let outcome = self.engine.sync_contact(&order, &self.mapping, &config).await?;
        Ok(HandleOutcome::Sync { outcome })
    }

    /// Removes the product tags of a refunded order
    #[instrument(skip(self), fields(integration = SLUG))]
    pub async fn order_refunded(&self, order_id: EntityId) -> Result<HandleOutcome, SyncError> {
        let order = self.engine.store().get(order_id).await?;
        let outcome = self.engine.reverse_sync(&order).await?;
        Ok(HandleOutcome::Reverse { outcome })
    }
}

#[async_trait]
impl Integration for EcommerceIntegration {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        SUBSCRIPTIONS
    }

    async fn handle(&self, event: &SyncEvent) -> Result<HandleOutcome, SyncError> {
        match &event.payload {
            EventPayload::OrderCompleted { order_id } => self.process_order(*order_id).await,
            EventPayload::OrderRefunded { order_id } => self.order_refunded(*order_id).await,
            _ => Ok(HandleOutcome::Ignored),
        }
    }

    fn settings(&self, crm_name: &str) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::heading("my_plugin_header", "My Plugin Name"),
            SettingDescriptor::new("my_plugin_checkbox", "Checkbox Option", SettingKind::Checkbox)
                .with_desc(format!("Check this checkbox to do something in {}.", crm_name)),
            SettingDescriptor::new("my_plugin_apply_tags", "Apply Tags to Customers", SettingKind::AssignTags)
                .with_desc(format!("Apply these tags in {} when someone makes a purchase.", crm_name)),
        ]
    }

    fn field_group(&self) -> Option<FieldGroup> {
        Some(FieldGroup::new(SLUG, "My Plugin Name"))
    }

    fn meta_fields(&self) -> Vec<FieldDescriptor> {
        plugin_meta_fields(SLUG)
    }

    fn export_option(&self) -> Option<ExportOption> {
        Some(ExportOption {
            key: EXPORT_KEY.to_string(),
            label: "Example Ecommerce Orders".to_string(),
            title: "Orders".to_string(),
            tooltip: "Finds Example orders that have not been processed, and adds/updates contacts \
                      while applying tags based on the products purchased."
                .to_string(),
        })
    }

    async fn batch_init(&self) -> Result<Vec<EntityId>, SyncError> {
        let pending = self.reconciler.discover_pending().await?;
        info!(integration = SLUG, count = pending.len(), "Orders export initialised");
        Ok(pending)
    }

    async fn batch_step(&self, id: EntityId) -> Result<HandleOutcome, SyncError> {
        let config = self.config.sync_config(SLUG);
        let outcome = self.reconciler.process_one(id, &config).await?;
        Ok(HandleOutcome::Sync { outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::FieldValue;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            id: EntityId::new(501),
            number: "501".to_string(),
            customer_id: None,
            billing: [
                ("billing_email".to_string(), FieldValue::text("Jane@Example.com")),
                ("billing_first_name".to_string(), FieldValue::text(" Jane ")),
                ("billing_unknown".to_string(), FieldValue::text("x")),
            ]
            .into_iter()
            .collect(),
            items: vec![LineItem::new(core_kernel::ItemId::new(10), 1)],
            total: dec!(49.99),
            date_paid: None,
            payment_method_title: Some("Credit Card".to_string()),
            customer_note: None,
            coupon_codes: vec![],
        }
    }

    #[test]
    fn test_order_exposes_billing_email_and_summary() {
        let order = order();
        assert_eq!(order.billing_email().as_deref(), Some("Jane@Example.com"));
        assert_eq!(order.account_id(), None);
        let summary = order.order_summary().unwrap();
        assert_eq!(summary.total, dec!(49.99));
        assert_eq!(summary.payment_method.as_deref(), Some("Credit Card"));
    }

    #[test]
    fn test_billing_mapping_formats_known_fields() {
        let mapped = billing_field_mapping().apply(&order().source_fields());
        assert_eq!(mapped.get("user_email"), Some(&FieldValue::text("jane@example.com")));
        assert_eq!(mapped.get("first_name"), Some(&FieldValue::text("Jane")));
        assert!(!mapped.contains_key("billing_unknown"));
        assert_eq!(mapped.len(), 2);
    }

    #[test]
    fn test_meta_fields_mark_pseudo() {
        let fields = plugin_meta_fields(SLUG);
        assert_eq!(fields.len(), 2);
        assert!(fields[0].synced_both_ways());
        assert!(!fields[1].synced_both_ways());
        assert!(fields.iter().all(|f| f.group == SLUG));
    }
}
