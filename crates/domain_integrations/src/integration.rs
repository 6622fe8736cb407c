//! The integration contract
//!
//! Every plugin integration implements [`Integration`]: it names the events
//! it handles, turns them into sync engine calls and declares its settings,
//! field catalog and batch contributions.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use core_kernel::{AccountId, ContactId, EntityId};
use domain_sync::{
    EventKind, FieldDescriptor, FieldGroup, ReverseOutcome, SyncError, SyncEvent, SyncOutcome, TagSet,
};

use crate::settings::{ExportOption, SettingDescriptor};

/// What an integration did with an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HandleOutcome {
    /// An entity was synced through the contact sync engine
    Sync { outcome: SyncOutcome },
    /// Line-item tags were reversed
    Reverse { outcome: ReverseOutcome },
    /// Profile fields were pushed against an account
    ProfilePush {
        account_id: AccountId,
        contact_id: Option<ContactId>,
        tags: TagSet,
    },
    /// The event kind is not handled by this integration
    Ignored,
}

impl fmt::Display for HandleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleOutcome::Sync {
                outcome: SyncOutcome::Synced { contact_id, tags },
            } => write!(f, "synced to contact {} with tags {}", contact_id, tags),
            HandleOutcome::Sync {
                outcome: SyncOutcome::AlreadyProcessed,
            } => f.write_str("already processed"),
            HandleOutcome::Reverse {
                outcome: ReverseOutcome::Removed { contact_id, tags },
            } => write!(f, "removed tags {} from contact {}", tags, contact_id),
            HandleOutcome::Reverse {
                outcome: ReverseOutcome::NothingToRemove,
            } => f.write_str("no tags to remove"),
            HandleOutcome::Reverse {
                outcome: ReverseOutcome::NoContact,
            } => f.write_str("no contact to remove tags from"),
            HandleOutcome::ProfilePush { account_id, .. } => write!(f, "profile pushed for user #{}", account_id),
            HandleOutcome::Ignored => f.write_str("ignored"),
        }
    }
}

/// A plugin integration
#[async_trait]
pub trait Integration: Send + Sync {
    /// Internal identifier, e.g. `my-ecommerce-plugin`
    fn slug(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Event kinds routed to [`Integration::handle`]
    fn subscriptions(&self) -> &'static [EventKind];

    async fn handle(&self, event: &SyncEvent) -> Result<HandleOutcome, SyncError>;

    /// Settings added to the integrations section
    fn settings(&self, _crm_name: &str) -> Vec<SettingDescriptor> {
        Vec::new()
    }

    fn field_group(&self) -> Option<FieldGroup> {
        None
    }

    /// Syncable fields, listed under [`Integration::field_group`]
    fn meta_fields(&self) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    /// Batch operation offered on the export screen
    fn export_option(&self) -> Option<ExportOption> {
        None
    }

    /// Ids of the entities the batch operation will process
    async fn batch_init(&self) -> Result<Vec<EntityId>, SyncError> {
        Err(SyncError::unsupported(format!("{} has no batch operation", self.slug())))
    }

    /// Processes one entity of the batch operation
    async fn batch_step(&self, _id: EntityId) -> Result<HandleOutcome, SyncError> {
        Err(SyncError::unsupported(format!("{} has no batch operation", self.slug())))
    }
}
