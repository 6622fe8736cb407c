//! Event dispatch scenarios across all three integrations

use std::sync::Arc;

use core_kernel::{Attributes, ContactId, FieldValue, TagId};
use domain_integrations::{
    ecommerce, forms, membership, HandleOutcome, HandlerStatus, Integration, IntegrationRegistry,
};
use domain_sync::{
    EntityStore, EventKind, EventPayload, FieldType, SyncConfig, SyncEvent,
    SyncOutcome,
};
use test_utils::{
    assert_tags_eq, FeedSettingsBuilder, FormSubmissionBuilder, IdFixtures, OrderBuilder,
    StringFixtures, SyncHarness,
};

fn registry(harness: &SyncHarness) -> IntegrationRegistry {
    let config = harness.config().with_integration(
        membership::SLUG,
        SyncConfig::default().with_tags([TagId::from("member")]),
    );
    harness.registry(Arc::new(config))
}

fn ok_outcome(status: &HandlerStatus) -> &HandleOutcome {
    match status {
        HandlerStatus::Ok { outcome, .. } => outcome,
        HandlerStatus::Failed { error, .. } => panic!("Handler failed: {}", error),
    }
}

async fn feed_with_email_mapping(harness: &SyncHarness) {
    harness
        .add_feed(
            IdFixtures::feed(),
            FeedSettingsBuilder::new()
                .map("1", "first_name", FieldType::Text)
                .map("2", "email", FieldType::Email)
                .apply_tag(TagId::from("lead"))
                .build(),
        )
        .await;
}

#[tokio::test]
async fn test_order_completed_routes_to_ecommerce() {
    let harness = SyncHarness::with_product_tags().await;
    let registry = registry(&harness);
    harness
        .orders
        .insert(
            OrderBuilder::new()
                .with_item(IdFixtures::product_a())
                .with_item(IdFixtures::product_b())
                .build(),
        )
        .await;

    let reports = registry
        .dispatch(&SyncEvent::order_completed(IdFixtures::order_501()))
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].integration, ecommerce::SLUG);
    assert_eq!(reports[0].event, EventKind::OrderCompleted);
    match ok_outcome(&reports[0].status) {
        HandleOutcome::Sync {
            outcome: SyncOutcome::Synced { tags, .. },
        } => assert_tags_eq(tags, &["T1", "T2", "T3"]),
        other => panic!("Unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_order_refunded_removes_product_tags() {
    let harness = SyncHarness::with_product_tags().await;
    let registry = registry(&harness);
    let order = OrderBuilder::new()
        .with_id(IdFixtures::order_502())
        .with_item(IdFixtures::product_a())
        .build();
    harness.orders.insert(order).await;

    let completed = registry
        .dispatch(&SyncEvent::order_completed(IdFixtures::order_502()))
        .await;
    assert!(completed[0].is_ok());

    let refunded = registry
        .dispatch(&SyncEvent::order_refunded(IdFixtures::order_502()))
        .await;
    assert!(refunded[0].is_ok());

    let contact_id = harness
        .orders
        .contact_id(IdFixtures::order_502())
        .await
        .unwrap()
        .unwrap();
    assert_tags_eq(&harness.crm.tags_for(&contact_id).await, &["T3"]);
}

#[tokio::test]
async fn test_unknown_order_reports_failure() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);

    let reports = registry.dispatch(&SyncEvent::order_completed(IdFixtures::order_501())).await;
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].is_ok());
}

#[tokio::test]
async fn test_form_submission_syncs_mapped_fields_with_feed_tags() {
    let harness = SyncHarness::new();
    feed_with_email_mapping(&harness).await;
    let registry = registry(&harness);

    let event = FormSubmissionBuilder::new()
        .field("1", " Jane ")
        .field("2", "Jane@Example.com")
        .field("7", "not mapped")
        .build_event();
    let reports = registry.dispatch(&event).await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].integration, forms::SLUG);
    let HandleOutcome::Sync {
        outcome: SyncOutcome::Synced { contact_id, tags },
    } = ok_outcome(&reports[0].status)
    else {
        panic!("Expected synced outcome");
    };
    assert_tags_eq(tags, &["lead"]);

    let attributes = harness.crm.contact(contact_id).await.unwrap();
    assert_eq!(attributes.get("email"), Some(&FieldValue::text("jane@example.com")));
    assert_eq!(attributes.get("first_name"), Some(&FieldValue::text("Jane")));
    assert_eq!(attributes.len(), 2);
    assert!(harness.entries.is_processed(IdFixtures::form_entry()).await.unwrap());
}

#[tokio::test]
async fn test_form_with_null_and_compound_fields_still_syncs() {
    let harness = SyncHarness::new();
    feed_with_email_mapping(&harness).await;
    let registry = registry(&harness);

    let event: SyncEvent = serde_json::from_value(serde_json::json!({
        "payload": {
            "kind": "form_submitted",
            "form_id": 3,
            "feed_id": 1,
            "entry_id": 900,
            "fields": {
                "1": "Jane",
                "2": "jane@example.com",
                "5": null,
                "6": {"first": "a", "last": "b"}
            }
        }
    }))
    .unwrap();
    let reports = registry.dispatch(&event).await;

    assert_eq!(reports.len(), 1);
    let HandleOutcome::Sync {
        outcome: SyncOutcome::Synced { contact_id, .. },
    } = ok_outcome(&reports[0].status)
    else {
        panic!("Expected synced outcome");
    };
    let attributes = harness.crm.contact(contact_id).await.unwrap();
    assert_eq!(attributes.len(), 2);
    assert_eq!(attributes.get("first_name"), Some(&FieldValue::text("Jane")));
    assert!(harness.entries.is_processed(IdFixtures::form_entry()).await.unwrap());
}

#[tokio::test]
async fn test_form_without_email_fails_terminally() {
    let harness = SyncHarness::new();
    feed_with_email_mapping(&harness).await;
    let registry = registry(&harness);

    let reports = registry
        .dispatch(&FormSubmissionBuilder::new().field("1", "Jane").build_event())
        .await;

    match &reports[0].status {
        HandlerStatus::Failed { error, retryable } => {
            assert!(error.contains("No email or account found"));
            assert!(!retryable);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(harness.crm.call_count().await, 0);
}

#[tokio::test]
async fn test_form_from_logged_in_user_uses_linked_contact() {
    let harness = SyncHarness::new();
    feed_with_email_mapping(&harness).await;
    let linked = ContactId::new("c-42");
    harness.link_account(IdFixtures::customer(), &linked).await;
    let registry = registry(&harness);

    let event = FormSubmissionBuilder::new()
        .with_account(IdFixtures::customer())
        .field("1", "Jane")
        .build_event();
    let reports = registry.dispatch(&event).await;

    match ok_outcome(&reports[0].status) {
        HandleOutcome::Sync { outcome } => assert_eq!(outcome.contact_id(), Some(&linked)),
        other => panic!("Unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_add_only_feed_keeps_existing_contact() {
    let harness = SyncHarness::new();
    let existing = harness
        .crm
        .seed_contact(StringFixtures::guest_email(), Attributes::new())
        .await;
    harness
        .add_feed(
            IdFixtures::feed(),
            FeedSettingsBuilder::new()
                .map("2", "email", FieldType::Email)
                .add_only()
                .build(),
        )
        .await;
    let registry = registry(&harness);

    let event = FormSubmissionBuilder::new()
        .field("2", StringFixtures::guest_email())
        .build_event();
    let reports = registry.dispatch(&event).await;

    match ok_outcome(&reports[0].status) {
        HandleOutcome::Sync { outcome } => assert_eq!(outcome.contact_id(), Some(&existing)),
        other => panic!("Unexpected outcome {:?}", other),
    }
    assert_eq!(harness.crm.upsert_count().await, 0);
}

#[tokio::test]
async fn test_unknown_feed_is_invalid_event() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);

    let reports = registry
        .dispatch(&FormSubmissionBuilder::new().with_generated_email("2").build_event())
        .await;

    match &reports[0].status {
        HandlerStatus::Failed { error, retryable } => {
            assert!(error.starts_with("Invalid event"));
            assert!(!retryable);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_user_registration_creates_and_tags_contact() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);
    let fields: Attributes = [
        ("username", "jdoe"),
        ("email", StringFixtures::customer_email()),
        ("custom-posted-field", "blue"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), FieldValue::text(v)))
    .collect();

    let event = SyncEvent::new(EventPayload::UserRegistered {
        account_id: IdFixtures::customer(),
        fields,
    });
    let reports = registry.dispatch(&event).await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].integration, membership::SLUG);
    let contact_id = match ok_outcome(&reports[0].status) {
        HandleOutcome::ProfilePush {
            contact_id: Some(contact_id),
            tags,
            ..
        } => {
            assert_tags_eq(tags, &["member"]);
            contact_id.clone()
        }
        other => panic!("Unexpected outcome {:?}", other),
    };
    assert_tags_eq(&harness.crm.tags_for(&contact_id).await, &["member"]);

    let pushes = harness.accounts.pushes().await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].1.get("meta_field_key"), Some(&FieldValue::text("blue")));
    assert_eq!(pushes[0].1.get("user_login"), Some(&FieldValue::text("jdoe")));
}

#[tokio::test]
async fn test_registration_without_email_reports_missing_identity() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);
    let fields: Attributes = [("username".to_string(), FieldValue::text("jdoe"))].into_iter().collect();

    let event = SyncEvent::new(EventPayload::UserRegistered {
        account_id: IdFixtures::customer(),
        fields,
    });
    let reports = registry.dispatch(&event).await;

    assert_eq!(reports.len(), 1);
    match &reports[0].status {
        HandlerStatus::Failed { error, retryable } => {
            assert!(error.starts_with("No email or account found"));
            assert!(!retryable);
        }
        other => panic!("Expected failure, got {:?}", other),
    }
    assert_eq!(harness.accounts.pushes().await.len(), 1);
    assert_eq!(harness.crm.call_count().await, 0);
}

#[tokio::test]
async fn test_profile_update_applies_no_tags() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);
    let fields: Attributes = [("username".to_string(), FieldValue::text("jdoe"))].into_iter().collect();

    let event = SyncEvent::new(EventPayload::UserUpdated {
        account_id: IdFixtures::customer(),
        fields,
    });
    let reports = registry.dispatch(&event).await;

    match ok_outcome(&reports[0].status) {
        HandleOutcome::ProfilePush { contact_id, tags, .. } => {
            assert!(contact_id.is_none());
            assert!(tags.is_empty());
        }
        other => panic!("Unexpected outcome {:?}", other),
    }
    assert_eq!(harness.crm.call_count().await, 0);
}

#[tokio::test]
async fn test_ecommerce_batch_backfills_pending_orders() {
    let harness = SyncHarness::with_product_tags().await;
    let registry = registry(&harness);
    harness
        .orders
        .insert(OrderBuilder::new().with_item(IdFixtures::product_a()).build())
        .await;
    harness
        .orders
        .insert_processed(OrderBuilder::new().with_id(IdFixtures::order_502()).build(), None)
        .await;

    let integration = registry.get(ecommerce::SLUG).unwrap();
    let pending = integration.batch_init().await.unwrap();
    assert_eq!(pending, vec![IdFixtures::order_501()]);

    let outcome = integration.batch_step(pending[0]).await.unwrap();
    assert!(matches!(
        outcome,
        HandleOutcome::Sync {
            outcome: SyncOutcome::Synced { .. }
        }
    ));
    assert!(integration.batch_init().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forms_offer_no_batch_operation() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);

    let integration = registry.get(forms::SLUG).unwrap();
    assert!(integration.export_option().is_none());
    assert!(integration.batch_init().await.is_err());
}

#[test]
fn test_registry_contributions() {
    let harness = SyncHarness::new();
    let registry = registry(&harness);

    let settings = registry.settings(StringFixtures::crm_name());
    assert!(settings.iter().any(|s| s.integration == membership::SLUG && s.setting.key == "my_plugin_text"));
    assert!(settings
        .iter()
        .filter_map(|s| s.setting.desc.as_deref())
        .any(|desc| desc.contains(StringFixtures::crm_name())));

    let catalog = registry.field_catalog();
    assert!(catalog.get("meta_field_key").is_some());
    assert!(!catalog.get("pseudo_field_key").unwrap().synced_both_ways());

    let exports = registry.export_options();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].option.key, ecommerce::EXPORT_KEY);

    assert_eq!(registry.subscribers(EventKind::FormSubmitted).len(), 1);
    assert_eq!(registry.subscribers(EventKind::UserUpdated).len(), 1);
}
