//! CRM Sync Domain
//!
//! This crate holds the data-mapping and idempotent-sync contract between a
//! plugin event and a CRM contact record.
//!
//! # Components
//!
//! - **Field Mapper** ([`FieldMapping`]): raw plugin fields to canonical
//!   contact attributes, with per-type value transforms
//! - **Tag Resolver** ([`TagResolver`]): global tags merged with per-item
//!   tags, deduplicated and filtered
//! - **Contact Sync Engine** ([`ContactSyncEngine`]): contact upsert, tag
//!   apply/remove, processed-flag and audit notes
//! - **Batch Reconciler** ([`BatchReconciler`]): replays the engine over
//!   entities that were never synced
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = ContactSyncEngine::new(crm, accounts, tag_config, orders);
//! let mapping = FieldMapping::new()
//!     .map_typed("billing_email", "user_email", FieldType::Email)
//!     .map("billing_first_name", "first_name");
//!
//! match engine.sync_contact(&order, &mapping, &config).await? {
//!     SyncOutcome::Synced { contact_id, tags } => println!("{} tagged {}", contact_id, tags),
//!     SyncOutcome::AlreadyProcessed => {}
//! }
//! ```

pub mod field_registry;
pub mod field_mapping;
pub mod tags;
pub mod entity;
pub mod contact;
pub mod config;
pub mod hooks;
pub mod events;
pub mod ports;
pub mod engine;
pub mod batch;
pub mod error;

pub use field_registry::{FieldDescriptor, FieldGroup, FieldRegistry, FieldType, is_email};
pub use field_mapping::{FieldMapEntry, FieldMapping};
pub use tags::{ItemTagConfig, TagResolver, TagSet, resolve_tags};
pub use entity::{EntityKind, LineItem, OrderSummary, SourceEntity};
pub use contact::{ContactRecord, Identity, order_attributes};
pub use config::{ConfigProvider, StaticConfigProvider, SyncConfig, DEFAULT_LOOKUP_FIELD};
pub use hooks::{DefaultHooks, SyncHooks};
pub use events::{EventKind, EventPayload, SyncEvent};
pub use ports::{AccountLinkPort, CrmContactPort, EntityStore, TagConfigPort};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{CrmCall, MockAccountLinks, MockCrm, MockEntityStore, MockTagConfig};
pub use engine::{ContactSyncEngine, ReverseOutcome, SyncOutcome};
pub use batch::{BatchItem, BatchReconciler, BatchRun, BatchSummary};
pub use error::SyncError;
