//! Batch operations
//!
//! The export screen first calls `init` to get the pending entity ids and
//! then one `step` per id. Progress lives in the entities' processed-flags,
//! so an interrupted batch is resumed by calling `init` again.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::EntityId;
use domain_integrations::Integration;

use crate::auth::{permissions, require, Claims};
use crate::dto::batch::{BatchInitResponse, BatchStepResponse};
use crate::error::ApiError;
use crate::AppState;

/// Finds an integration by slug or by the key of its export option
fn find_integration(state: &AppState, slug: &str) -> Result<Arc<dyn Integration>, ApiError> {
    if let Some(integration) = state.registry.get(slug) {
        return Ok(integration.clone());
    }
    state
        .registry
        .integrations()
        .find(|i| i.export_option().is_some_and(|option| option.key == slug))
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Integration {} not found", slug)))
}

#[instrument(skip(state, claims), fields(user = %claims.sub))]
pub async fn batch_init(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<BatchInitResponse>, ApiError> {
    require(&claims, permissions::SYNC_BATCH)?;
    let integration = find_integration(&state, &slug)?;

    let pending = integration.batch_init().await?;
    info!(integration = integration.slug(), count = pending.len(), "Batch initialised");

    Ok(Json(BatchInitResponse {
        integration: integration.slug().to_string(),
        total: pending.len(),
        pending,
    }))
}

#[instrument(skip(state, claims), fields(user = %claims.sub))]
pub async fn batch_step(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((slug, id)): Path<(String, u64)>,
) -> Result<Json<BatchStepResponse>, ApiError> {
    require(&claims, permissions::SYNC_BATCH)?;
    let integration = find_integration(&state, &slug)?;
    let entity_id = EntityId::new(id);

    let outcome = integration.batch_step(entity_id).await?;

    Ok(Json(BatchStepResponse {
        integration: integration.slug().to_string(),
        entity_id,
        summary: outcome.to_string(),
        outcome,
    }))
}
