//! Forms integration
//!
//! Each form can have feeds binding its fields to CRM fields. When a form is
//! submitted, the feed's field map decides which values are synced, the
//! contact email is picked from the mapped values and the feed's tags are
//! applied to the contact.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use core_kernel::{AccountId, Attributes, DomainPort, EntityId, FeedId, FormId, PortError};
use domain_sync::{
    ConfigProvider, ContactSyncEngine, EntityKind, EventKind, EventPayload, FieldMapEntry,
    FieldMapping, FieldType, SourceEntity, SyncConfig, SyncError, SyncEvent, TagSet,
};

use crate::integration::{HandleOutcome, Integration};

pub const SLUG: &str = "my-forms-plugin";
pub const NAME: &str = "My Forms Plugin";

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::FormSubmitted];

/// Mapping of one form field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapSetting {
    /// CRM field the value is synced to, `None` when the field is not synced
    #[serde(default)]
    pub crm_field: Option<String>,
    /// Form field type, selects the value transform
    #[serde(default, rename = "type")]
    pub field_type: Option<FieldType>,
}

/// Settings of one feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    /// Form field id to CRM field mapping
    #[serde(default)]
    pub fields_map: BTreeMap<String, FieldMapSetting>,
    #[serde(default)]
    pub apply_tags: TagSet,
    /// Only add new contacts, don't update existing ones
    #[serde(default)]
    pub add_only: bool,
}

impl FeedSettings {
    /// Field mapping for the mapped form fields, in form field order
    pub fn field_mapping(&self) -> FieldMapping {
        let mut entries: Vec<(&String, &FieldMapSetting)> = self
            .fields_map
            .iter()
            .filter(|(_, setting)| setting.crm_field.as_deref().is_some_and(|f| !f.trim().is_empty()))
            .collect();
        // Numeric field ids sort numerically so "10" follows "9"
        entries.sort_by_key(|(id, _)| (id.parse::<u64>().ok(), (*id).clone()));

        entries
            .into_iter()
            .filter_map(|(id, setting)| {
                setting.crm_field.as_ref().map(|crm_field| FieldMapEntry {
                    source_key: id.clone(),
                    target_key: crm_field.clone(),
                    field_type: setting.field_type,
                })
            })
            .collect()
    }

    /// Applies the feed's tags and add-only flag on top of the site config
    pub fn sync_config(&self, base: SyncConfig) -> SyncConfig {
        SyncConfig {
            apply_tags: self.apply_tags.clone(),
            add_only: self.add_only,
            ..base
        }
    }
}

/// Storage of feed settings
#[async_trait]
pub trait FeedSettingsPort: DomainPort {
    async fn feed_settings(&self, feed_id: FeedId) -> Result<Option<FeedSettings>, PortError>;
}

/// Feed settings held in memory
#[derive(Debug, Default)]
pub struct InMemoryFeedSettings {
    feeds: RwLock<HashMap<FeedId, FeedSettings>>,
}

impl InMemoryFeedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, feed_id: FeedId, settings: FeedSettings) {
        self.feeds.write().await.insert(feed_id, settings);
    }
}

impl DomainPort for InMemoryFeedSettings {}

#[async_trait]
impl FeedSettingsPort for InMemoryFeedSettings {
    async fn feed_settings(&self, feed_id: FeedId) -> Result<Option<FeedSettings>, PortError> {
        Ok(self.feeds.read().await.get(&feed_id).cloned())
    }
}

/// A stored form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEntry {
    pub id: EntityId,
    pub form_id: FormId,
    pub feed_id: FeedId,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    /// Submitted values keyed by form field id
    pub fields: Attributes,
}

impl SourceEntity for FormEntry {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::FormEntry
    }

    fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    fn source_fields(&self) -> Attributes {
        self.fields.clone()
    }
}

/// The forms plugin integration
#[derive(Clone)]
pub struct FormsIntegration {
    engine: ContactSyncEngine<FormEntry>,
    feeds: Arc<dyn FeedSettingsPort>,
    config: Arc<dyn ConfigProvider>,
}

impl FormsIntegration {
    pub fn new(
        engine: ContactSyncEngine<FormEntry>,
        feeds: Arc<dyn FeedSettingsPort>,
        config: Arc<dyn ConfigProvider>,
    ) -> Self {
        Self { engine, feeds, config }
    }

    /// Syncs a form submission through its feed
    #[instrument(skip(self, entry), fields(integration = SLUG, entry_id = %entry.id, feed_id = %entry.feed_id))]
    pub async fn form_submission(&self, entry: FormEntry) -> Result<HandleOutcome, SyncError> {
        let Some(settings) = self.feeds.feed_settings(entry.feed_id).await? else {
            warn!("Form submitted to unknown feed");
            return Err(SyncError::invalid_event(format!(
                "feed #{} is not configured for form #{}",
                entry.feed_id, entry.form_id
            )));
        };

        let mapping = settings.field_mapping();
        let config = settings.sync_config(self.config.sync_config(SLUG));
        debug!(mapped_fields = mapping.entries().len(), add_only = config.add_only, "Processing form entry");

        self.engine.store().save(entry.clone()).await?;
        let outcome = self.engine.sync_contact(&entry, &mapping, &config).await?;
        Ok(HandleOutcome::Sync { outcome })
    }
}

#[async_trait]
impl Integration for FormsIntegration {
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
            EventPayload::FormSubmitted {
                form_id,
                feed_id,
                entry_id,
                account_id,
                fields,
            } => {
                self.form_submission(FormEntry {
                    id: *entry_id,
                    form_id: *form_id,
                    feed_id: *feed_id,
                    account_id: *account_id,
                    fields: fields.clone(),
                })
                .await
            }
            _ => Ok(HandleOutcome::Ignored),
        }
    }
}
