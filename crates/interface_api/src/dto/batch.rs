//! Batch DTOs

use serde::Serialize;

use core_kernel::EntityId;
use domain_integrations::HandleOutcome;

#[derive(Debug, Serialize)]
pub struct BatchInitResponse {
    pub integration: String,
    pub total: usize,
    /// Pending entity ids, each to be passed to a step call
    pub pending: Vec<EntityId>,
}

#[derive(Debug, Serialize)]
pub struct BatchStepResponse {
    pub integration: String,
    pub entity_id: EntityId,
    pub outcome: HandleOutcome,
    pub summary: String,
}
