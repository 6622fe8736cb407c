//! Integration Registry
//!
//! Routes platform events to the integrations subscribed to them. The
//! event-kind to handler table is built once from the enabled integrations;
//! after that the registry is read-only and shared across requests.
//!
//! Handler errors never reach the event source: each one is logged and
//! reported alongside the successful handlers.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument};

use domain_sync::{EventKind, FieldRegistry, SyncEvent};

use crate::integration::{HandleOutcome, Integration};
use crate::settings::{ExportOption, SettingDescriptor};

/// Result of one integration handling one event
#[derive(Debug, Clone, Serialize)]
pub struct HandlerReport {
    pub integration: String,
    pub event: EventKind,
    #[serde(flatten)]
    pub status: HandlerStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HandlerStatus {
    Ok {
        outcome: HandleOutcome,
        summary: String,
    },
    Failed {
        error: String,
        retryable: bool,
    },
}

impl HandlerReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, HandlerStatus::Ok { .. })
    }
}

/// A setting together with the integration contributing it
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationSetting {
    pub integration: String,
    #[serde(flatten)]
    pub setting: SettingDescriptor,
}

/// An export option together with the integration offering it
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationExport {
    pub integration: String,
    #[serde(flatten)]
    pub option: ExportOption,
}

/// Registry of enabled integrations
#[derive(Clone, Default)]
pub struct IntegrationRegistry {
    integrations: Vec<Arc<dyn Integration>>,
    handlers: BTreeMap<EventKind, Vec<usize>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables an integration and subscribes it to its event kinds
    pub fn register(mut self, integration: Arc<dyn Integration>) -> Self {
        let index = self.integrations.len();
        for kind in integration.subscriptions() {
            self.handlers.entry(*kind).or_default().push(index);
        }
        info!(
            integration = integration.slug(),
            events = integration.subscriptions().len(),
            "Integration enabled"
        );
        self.integrations.push(integration);
        self
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<dyn Integration>> {
        self.integrations.iter().find(|i| i.slug() == slug)
    }

    pub fn integrations(&self) -> impl Iterator<Item = &Arc<dyn Integration>> {
        self.integrations.iter()
    }

    /// Integrations subscribed to the given event kind, in registration order
    pub fn subscribers(&self, kind: EventKind) -> Vec<&Arc<dyn Integration>> {
        self.handlers
            .get(&kind)
            .map(|indexes| indexes.iter().map(|i| &self.integrations[*i]).collect())
            .unwrap_or_default()
    }

    /// Runs every subscribed handler in turn and reports on each
    #[instrument(skip(self, event), fields(event = %event.kind(), entity_id = %event.entity_id()))]
    pub async fn dispatch(&self, event: &SyncEvent) -> Vec<HandlerReport> {
        let kind = event.kind();
        let mut reports = Vec::new();

        for integration in self.subscribers(kind) {
            let status = match integration.handle(event).await {
                Ok(outcome) => {
                    info!(integration = integration.slug(), result = %outcome, "Event handled");
                    HandlerStatus::Ok {
                        summary: outcome.to_string(),
                        outcome,
                    }
                }
                Err(e) => {
                    error!(integration = integration.slug(), error = %e, "Event handler failed");
                    HandlerStatus::Failed {
                        retryable: e.is_retryable(),
                        error: e.to_string(),
                    }
                }
            };
            reports.push(HandlerReport {
                integration: integration.slug().to_string(),
                event: kind,
                status,
            });
        }

        reports
    }

    /// All settings contributed by the enabled integrations
    pub fn settings(&self, crm_name: &str) -> Vec<IntegrationSetting> {
        self.integrations
            .iter()
            .flat_map(|integration| {
                integration
                    .settings(crm_name)
                    .into_iter()
                    .map(move |setting| IntegrationSetting {
                        integration: integration.slug().to_string(),
                        setting,
                    })
            })
            .collect()
    }

    /// Field groups and syncable fields of all enabled integrations
    pub fn field_catalog(&self) -> FieldRegistry {
        let mut catalog = FieldRegistry::new();
        for integration in &self.integrations {
            if let Some(group) = integration.field_group() {
                catalog.add_group(group);
            }
            for field in integration.meta_fields() {
                catalog.register(field);
            }
        }
        catalog
    }

    pub fn export_options(&self) -> Vec<IntegrationExport> {
        self.integrations
            .iter()
            .filter_map(|integration| {
                integration.export_option().map(|option| IntegrationExport {
                    integration: integration.slug().to_string(),
                    option,
                })
            })
            .collect()
    }
}

impl fmt::Debug for IntegrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slugs: Vec<&str> = self.integrations.iter().map(|i| i.slug()).collect();
        f.debug_struct("IntegrationRegistry")
            .field("integrations", &slugs)
            .field("handlers", &self.handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_kernel::EntityId;
    use domain_sync::SyncError;

    struct Failing;

    #[async_trait]
    impl Integration for Failing {
        fn slug(&self) -> &'static str {
            "failing"
        }

        fn name(&self) -> &'static str {
            "Failing"
        }

        fn subscriptions(&self) -> &'static [EventKind] {
            &[EventKind::OrderCompleted]
        }

        async fn handle(&self, _event: &SyncEvent) -> Result<HandleOutcome, SyncError> {
            Err(SyncError::invalid_event("broken payload"))
        }
    }

    struct Quiet;

    #[async_trait]
    impl Integration for Quiet {
        fn slug(&self) -> &'static str {
            "quiet"
        }

        fn name(&self) -> &'static str {
            "Quiet"
        }

        fn subscriptions(&self) -> &'static [EventKind] {
            &[EventKind::OrderCompleted, EventKind::UserUpdated]
        }

        async fn handle(&self, _event: &SyncEvent) -> Result<HandleOutcome, SyncError> {
            Ok(HandleOutcome::Ignored)
        }
    }

    fn registry() -> IntegrationRegistry {
        IntegrationRegistry::new()
            .register(Arc::new(Failing))
            .register(Arc::new(Quiet))
    }

    #[tokio::test]
    async fn test_dispatch_reports_every_subscriber() {
        let reports = registry().dispatch(&SyncEvent::order_completed(EntityId::new(1))).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].integration, "failing");
        assert!(!reports[0].is_ok());
        assert!(reports[1].is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_without_subscribers_is_empty() {
        let reports = registry().dispatch(&SyncEvent::order_refunded(EntityId::new(1))).await;
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_unsupported_by_default() {
        let registry = registry();
        let quiet = registry.get("quiet").unwrap();
        assert!(matches!(quiet.batch_init().await, Err(SyncError::Unsupported(_))));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_failed_report_serializes_flat() {
        let report = HandlerReport {
            integration: "failing".to_string(),
            event: EventKind::OrderCompleted,
            status: HandlerStatus::Failed {
                error: "boom".to_string(),
                retryable: false,
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["event"], "order_completed");
        assert_eq!(json["error"], "boom");
    }
}
