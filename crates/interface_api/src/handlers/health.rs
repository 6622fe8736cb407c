//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub crm: HealthCheckResult,
}

/// Liveness check including the CRM adapter
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let crm = state.crm.health_check().await;
    let (status, label) = match crm.status {
        AdapterHealth::Healthy => (StatusCode::OK, "healthy"),
        AdapterHealth::Degraded => (StatusCode::OK, "degraded"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            crm,
        }),
    )
}
