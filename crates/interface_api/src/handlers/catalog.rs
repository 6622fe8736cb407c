//! Settings, field catalog and export options

use axum::{extract::State, Json};

use crate::dto::catalog::{ExportsResponse, FieldCatalogResponse, SettingsResponse};
use crate::AppState;

pub async fn list_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        settings: state.registry.settings(&state.config.crm_name),
        crm_name: state.config.crm_name.clone(),
    })
}

pub async fn list_fields(State(state): State<AppState>) -> Json<FieldCatalogResponse> {
    Json(state.registry.field_catalog().into())
}

pub async fn list_exports(State(state): State<AppState>) -> Json<ExportsResponse> {
    Json(ExportsResponse {
        exports: state.registry.export_options(),
    })
}
