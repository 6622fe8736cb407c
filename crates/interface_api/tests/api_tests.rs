//! Router tests driving the full middleware stack

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;

use interface_api::{
    auth::{create_token, permissions},
    config::ApiConfig,
    create_router, AppState,
};
use test_utils::{IdFixtures, OrderBuilder, StringFixtures, SyncHarness};

const SECRET: &str = "router-test-secret-0123456789";

fn config() -> ApiConfig {
    ApiConfig {
        jwt_secret: SECRET.to_string(),
        crm_name: StringFixtures::crm_name().to_string(),
        purchase_tags: "T3".to_string(),
        ..Default::default()
    }
}

fn server(harness: &SyncHarness) -> TestServer {
    let config = config();
    let registry = harness.registry(Arc::new(config.sync_settings()));
    TestServer::new(create_router(AppState::new(registry, config, harness.crm.clone()))).unwrap()
}

fn token(roles: &[&str]) -> String {
    create_token(
        "operator-1",
        roles.iter().map(|r| r.to_string()).collect(),
        SECRET,
        300,
    )
    .unwrap()
}

fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

#[tokio::test]
async fn test_health_reports_crm_status() {
    let harness = SyncHarness::new();
    let response = server(&harness).get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["crm"]["status"], "healthy");
}

#[tokio::test]
async fn test_order_event_is_dispatched() {
    let harness = SyncHarness::with_product_tags().await;
    harness
        .orders
        .insert(OrderBuilder::new().with_item(IdFixtures::product_a()).build())
        .await;

    let event = json!({
        "payload": {"kind": "order_completed", "order_id": 501}
    });
    let response = server(&harness).post("/api/v1/events").json(&event).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["event"], "order_completed");
    assert_eq!(body["handled"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["reports"][0]["integration"], "my-ecommerce-plugin");
    assert_eq!(body["reports"][0]["status"], "ok");
    assert_eq!(body["reports"][0]["outcome"]["action"], "sync");
    assert_eq!(body["reports"][0]["outcome"]["outcome"]["tags"], json!(["T1", "T2", "T3"]));
}

#[tokio::test]
async fn test_failed_handler_is_reported_not_raised() {
    let harness = SyncHarness::new();
    let event = json!({
        "payload": {
            "kind": "form_submitted",
            "form_id": 3,
            "feed_id": 99,
            "entry_id": 900,
            "fields": {"1": "Jane"}
        }
    });

    let response = server(&harness).post("/api/v1/events").json(&event).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["failed"], 1);
    assert_eq!(body["reports"][0]["status"], "failed");
    assert_eq!(body["reports"][0]["retryable"], false);
}

#[tokio::test]
async fn test_malformed_event_is_rejected() {
    let harness = SyncHarness::new();
    let event = json!({"payload": {"kind": "order_shipped", "order_id": 1}});

    let response = server(&harness)
        .post("/api/v1/events")
        .json(&event)
        .expect_failure()
        .await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_catalog_routes() {
    let harness = SyncHarness::new();
    let server = server(&harness);

    let settings: Value = server.get("/api/v1/settings").await.json();
    assert_eq!(settings["crm_name"], StringFixtures::crm_name());
    let settings = settings["settings"].as_array().unwrap();
    assert!(settings.iter().any(|s| s["key"] == "my_plugin_apply_tags" && s["type"] == "assign_tags"));

    let fields: Value = server.get("/api/v1/fields").await.json();
    assert!(fields["fields"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f["key"] == "pseudo_field_key"));
    assert!(!fields["groups"].as_array().unwrap().is_empty());

    let exports: Value = server.get("/api/v1/exports").await.json();
    assert_eq!(exports["exports"][0]["key"], "example_ecommerce");
    assert_eq!(exports["exports"][0]["integration"], "my-ecommerce-plugin");
}

#[tokio::test]
async fn test_batch_requires_token() {
    let harness = SyncHarness::new();
    let response = server(&harness)
        .post("/api/v1/batch/example_ecommerce/init")
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_batch_requires_permission() {
    let harness = SyncHarness::new();
    let request = server(&harness).post("/api/v1/batch/example_ecommerce/init");

    let response = bearer(request, &token(&["catalog:read"])).expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_batch_init_and_step() {
    let harness = SyncHarness::with_product_tags().await;
    harness
        .orders
        .insert(OrderBuilder::new().with_item(IdFixtures::product_b()).build())
        .await;
    let server = server(&harness);
    let token = token(&[permissions::SYNC_BATCH]);

    let init: Value = bearer(server.post("/api/v1/batch/example_ecommerce/init"), &token)
        .await
        .json();
    assert_eq!(init["total"], 1);
    assert_eq!(init["pending"], json!([501]));

    let step: Value = bearer(server.post("/api/v1/batch/my-ecommerce-plugin/step/501"), &token)
        .await
        .json();
    assert_eq!(step["entity_id"], 501);
    assert_eq!(step["outcome"]["outcome"]["status"], "synced");

    let again: Value = bearer(server.post("/api/v1/batch/example_ecommerce/init"), &token)
        .await
        .json();
    assert_eq!(again["total"], 0);
}

#[tokio::test]
async fn test_batch_errors_map_to_status() {
    let harness = SyncHarness::new();
    harness
        .orders
        .insert(OrderBuilder::new().without_billing_email().build())
        .await;
    let server = server(&harness);
    let token = token(&["admin"]);

    let response = bearer(server.post("/api/v1/batch/example_ecommerce/step/501"), &token)
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["retryable"], false);

    let response = bearer(server.post("/api/v1/batch/my-forms-plugin/init"), &token)
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = bearer(server.post("/api/v1/batch/unknown/init"), &token)
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let harness = SyncHarness::new();
    let response = server(&harness)
        .get("/api/v1/exports")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "req-123");
}
