//! Batch Reconciler
//!
//! Backfills entities that were never synced (created before the
//! integration was enabled, or whose sync failed) by replaying the contact
//! sync engine over them one at a time. The reconciler holds no state of its
//! own: the processed-flag in the entity store is the only progress marker,
//! so a batch can be stopped and resumed at any point.

use serde::Serialize;
use tracing::{info, instrument, warn};

use core_kernel::EntityId;

use crate::config::SyncConfig;
use crate::engine::{ContactSyncEngine, SyncOutcome};
use crate::entity::SourceEntity;
use crate::error::SyncError;
use crate::field_mapping::FieldMapping;

/// Replays the sync engine over unprocessed entities
#[derive(Debug, Clone)]
pub struct BatchReconciler<E> {
    engine: ContactSyncEngine<E>,
    mapping: FieldMapping,
}

/// Outcome of one entity in a batch run
#[derive(Debug)]
pub struct BatchItem {
    pub entity_id: EntityId,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Per-entity results of a full batch run, in processing order
#[derive(Debug, Default)]
pub struct BatchRun {
    pub items: Vec<BatchItem>,
}

/// Counts reported after a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchRun {
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.items.len(),
            ..Default::default()
        };
        for item in &self.items {
            match &item.result {
                Ok(SyncOutcome::Synced { .. }) => summary.synced += 1,
                Ok(SyncOutcome::AlreadyProcessed) => summary.skipped += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

impl<E: SourceEntity + 'static> BatchReconciler<E> {
    pub fn new(engine: ContactSyncEngine<E>, mapping: FieldMapping) -> Self {
        Self { engine, mapping }
    }

    /// Returns the ids of unprocessed entities, oldest first
    pub async fn discover_pending(&self) -> Result<Vec<EntityId>, SyncError> {
        let pending = self.engine.store().pending().await?;
        info!(count = pending.len(), "Discovered unprocessed entities");
        Ok(pending)
    }

    /// Loads one entity and syncs it
    #[instrument(skip(self, config), fields(entity_id = %id))]
    pub async fn process_one(&self, id: EntityId, config: &SyncConfig) -> Result<SyncOutcome, SyncError> {
        let entity = self.engine.store().get(id).await?;
        self.engine.sync_contact(&entity, &self.mapping, config).await
    }

    /// Processes every pending entity in order
    ///
    /// A failing entity is recorded and the run moves on to the next one.
    pub async fn run_all(&self, config: &SyncConfig) -> Result<BatchRun, SyncError> {
        let mut run = BatchRun::default();
        for entity_id in self.discover_pending().await? {
            let result = self.process_one(entity_id, config).await;
            if let Err(error) = &result {
                warn!(entity_id = %entity_id, error = %error, "Batch step failed");
            }
            run.items.push(BatchItem { entity_id, result });
        }

        let summary = run.summary();
        info!(
            total = summary.total,
            synced = summary.synced,
            failed = summary.failed,
            "Batch run finished"
        );
        Ok(run)
    }
}
