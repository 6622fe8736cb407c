//! Sync Collaborator Ports
//!
//! The sync engine never talks to a CRM, the user table or the plugin's
//! storage directly. Each collaborator is a port trait implemented by the
//! host platform:
//!
//! - **CrmContactPort**: the CRM facade (contact upsert, tag apply/remove)
//! - **AccountLinkPort**: site accounts and their linked CRM contacts
//! - **TagConfigPort**: per-item tag settings
//! - **EntityStore**: plugin records plus their processed-flag, stored
//!   contact id and audit notes
//!
//! # Usage
//!
//! ```rust,ignore
//! let engine = ContactSyncEngine::new(
//!     Arc::new(HostCrm::new(api_client)),
//!     Arc::new(UserMetaLinks::new(pool.clone())),
//!     Arc::new(ProductSettings::new(pool.clone())),
//!     Arc::new(OrderStore::new(pool)),
//! );
//! ```
//!
//! In-memory implementations of every port live in [`mock`], enabled for
//! tests and by the `mock` feature.

use async_trait::async_trait;

use core_kernel::{
    AccountId, Attributes, ContactId, DomainPort, EntityId, HealthCheckable, ItemId,
    OperationMetadata, PortError,
};

use crate::contact::ContactRecord;
use crate::entity::SourceEntity;
use crate::tags::{ItemTagConfig, TagSet};

/// The CRM facade
///
/// Contacts are found and created by identity (email address). All calls
/// may fail with a transient [`PortError`]; the engine never retries
/// inline.
#[async_trait]
pub trait CrmContactPort: DomainPort + HealthCheckable {
    /// Display name of the connected CRM, used in audit notes
    fn name(&self) -> &str;

    /// Looks up an existing contact by email
    async fn find_by_identity(
        &self,
        email: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<Option<ContactId>, PortError>;

    /// Creates the contact, or updates it if one already exists for the
    /// record's email
    async fn create_or_update_by_identity(
        &self,
        record: &ContactRecord,
        metadata: Option<OperationMetadata>,
    ) -> Result<ContactId, PortError>;

    async fn apply_tags(
        &self,
        tags: &TagSet,
        contact_id: &ContactId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    async fn remove_tags(
        &self,
        tags: &TagSet,
        contact_id: &ContactId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;

    /// Link to the contact in the CRM's own admin, if the CRM has one
    fn contact_edit_url(&self, contact_id: &ContactId) -> Option<String>;
}

/// Site accounts and their linked CRM contacts
#[async_trait]
pub trait AccountLinkPort: DomainPort {
    /// Returns the contact linked to the account, if any
    async fn linked_contact_id(&self, account_id: AccountId) -> Result<Option<ContactId>, PortError>;

    /// Records the link between an account and a CRM contact
    async fn link_contact(&self, account_id: AccountId, contact_id: &ContactId) -> Result<(), PortError>;

    /// Pushes attributes to the CRM through the account's user meta
    async fn push_attributes(&self, account_id: AccountId, attributes: &Attributes) -> Result<(), PortError>;
}

/// Per-item (product) tag settings
#[async_trait]
pub trait TagConfigPort: DomainPort {
    async fn tag_config(&self, item_id: ItemId) -> Result<Option<ItemTagConfig>, PortError>;
}

/// Plugin-side storage for one entity kind
///
/// Besides loading entities, the store owns the per-entity sync state: the
/// processed-flag, the stored contact id and the human-readable audit trail.
#[async_trait]
pub trait EntityStore<E: SourceEntity>: DomainPort {
    async fn get(&self, id: EntityId) -> Result<E, PortError>;

    /// Persists an entity, keeping any sync state already recorded for it
    async fn save(&self, entity: E) -> Result<(), PortError>;

    async fn is_processed(&self, id: EntityId) -> Result<bool, PortError>;

    async fn set_processed(&self, id: EntityId) -> Result<(), PortError>;

    async fn append_audit_note(&self, id: EntityId, note: &str) -> Result<(), PortError>;

    async fn store_contact_id(&self, id: EntityId, contact_id: &ContactId) -> Result<(), PortError>;

    async fn contact_id(&self, id: EntityId) -> Result<Option<ContactId>, PortError>;

    /// Unprocessed entities, ordered by id (creation order)
    async fn pending(&self) -> Result<Vec<EntityId>, PortError>;
}

/// In-memory port implementations for tests and development backends
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, HealthCheckResult};

    /// A call received by [`MockCrm`]
    #[derive(Debug, Clone, PartialEq)]
    pub enum CrmCall {
        Find(String),
        Upsert(ContactRecord),
        ApplyTags(ContactId, TagSet),
        RemoveTags(ContactId, TagSet),
    }

    /// In-memory CRM recording every call it receives
    #[derive(Debug)]
    pub struct MockCrm {
        name: String,
        contacts: RwLock<HashMap<ContactId, Attributes>>,
        by_email: RwLock<BTreeMap<String, ContactId>>,
        tags: RwLock<HashMap<ContactId, TagSet>>,
        calls: RwLock<Vec<CrmCall>>,
        next_id: AtomicU64,
        fail_upserts: AtomicBool,
        fail_tag_apply: AtomicBool,
        fail_tag_remove: AtomicBool,
    }

    impl Default for MockCrm {
        fn default() -> Self {
            Self::with_name("Mock CRM")
        }
    }

    impl MockCrm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_name(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                contacts: RwLock::new(HashMap::new()),
                by_email: RwLock::new(BTreeMap::new()),
                tags: RwLock::new(HashMap::new()),
                calls: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                fail_upserts: AtomicBool::new(false),
                fail_tag_apply: AtomicBool::new(false),
                fail_tag_remove: AtomicBool::new(false),
            }
        }

        /// Adds an existing contact without recording a call
        pub async fn seed_contact(&self, email: &str, attributes: Attributes) -> ContactId {
            let id = self.allocate_id();
            self.by_email.write().await.insert(email.to_lowercase(), id.clone());
            self.contacts.write().await.insert(id.clone(), attributes);
            id
        }

        pub fn fail_upserts(&self, fail: bool) {
            self.fail_upserts.store(fail, Ordering::SeqCst);
        }

        pub fn fail_tag_apply(&self, fail: bool) {
            self.fail_tag_apply.store(fail, Ordering::SeqCst);
        }

        pub fn fail_tag_remove(&self, fail: bool) {
            self.fail_tag_remove.store(fail, Ordering::SeqCst);
        }

        pub async fn calls(&self) -> Vec<CrmCall> {
            self.calls.read().await.clone()
        }

        pub async fn call_count(&self) -> usize {
            self.calls.read().await.len()
        }

        pub async fn upsert_count(&self) -> usize {
            self.calls
                .read()
                .await
                .iter()
                .filter(|c| matches!(c, CrmCall::Upsert(_)))
                .count()
        }

        pub async fn contact(&self, id: &ContactId) -> Option<Attributes> {
            self.contacts.read().await.get(id).cloned()
        }

        pub async fn contact_by_email(&self, email: &str) -> Option<ContactId> {
            self.by_email.read().await.get(&email.to_lowercase()).cloned()
        }

        pub async fn tags_for(&self, id: &ContactId) -> TagSet {
            self.tags.read().await.get(id).cloned().unwrap_or_default()
        }

        fn allocate_id(&self) -> ContactId {
            ContactId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
        }
    }

    impl DomainPort for MockCrm {}

    #[async_trait]
    impl HealthCheckable for MockCrm {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-crm".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl CrmContactPort for MockCrm {
        fn name(&self) -> &str {
            &self.name
        }

        async fn find_by_identity(
            &self,
            email: &str,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Option<ContactId>, PortError> {
            self.calls.write().await.push(CrmCall::Find(email.to_string()));
            Ok(self.contact_by_email(email).await)
        }

        async fn create_or_update_by_identity(
            &self,
            record: &ContactRecord,
            _metadata: Option<OperationMetadata>,
        ) -> Result<ContactId, PortError> {
            self.calls.write().await.push(CrmCall::Upsert(record.clone()));
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Err(PortError::connection("CRM API unreachable"));
            }

            let email = record
                .identity
                .email()
                .map(str::to_lowercase)
                .ok_or_else(|| PortError::validation_field("Contact has no email", "email"))?;

            let existing = self.by_email.read().await.get(&email).cloned();
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = self.allocate_id();
                    self.by_email.write().await.insert(email, id.clone());
                    id
                }
            };

            let mut contacts = self.contacts.write().await;
            let attributes = contacts.entry(id.clone()).or_default();
            attributes.extend(record.attributes.clone());
            Ok(id)
        }

        async fn apply_tags(
            &self,
            tags: &TagSet,
            contact_id: &ContactId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.calls
                .write()
                .await
                .push(CrmCall::ApplyTags(contact_id.clone(), tags.clone()));
            if self.fail_tag_apply.load(Ordering::SeqCst) {
                return Err(PortError::rejected("Tag apply refused"));
            }
            self.tags
                .write()
                .await
                .entry(contact_id.clone())
                .or_default()
                .extend(tags.iter().cloned());
            Ok(())
        }

        async fn remove_tags(
            &self,
            tags: &TagSet,
            contact_id: &ContactId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            self.calls
                .write()
                .await
                .push(CrmCall::RemoveTags(contact_id.clone(), tags.clone()));
            if self.fail_tag_remove.load(Ordering::SeqCst) {
                return Err(PortError::rejected("Tag removal refused"));
            }
            let mut all = self.tags.write().await;
            if let Some(current) = all.get_mut(contact_id) {
                *current = current.iter().filter(|t| !tags.contains(t)).cloned().collect();
            }
            Ok(())
        }

        fn contact_edit_url(&self, contact_id: &ContactId) -> Option<String> {
            Some(format!("https://crm.example.test/contacts/{}", contact_id))
        }
    }

    /// In-memory account links
    #[derive(Debug, Default)]
    pub struct MockAccountLinks {
        links: RwLock<HashMap<AccountId, ContactId>>,
        pushes: RwLock<Vec<(AccountId, Attributes)>>,
    }

    impl MockAccountLinks {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_link(self, account_id: AccountId, contact_id: ContactId) -> Self {
            self.links.write().await.insert(account_id, contact_id);
            self
        }

        /// Attribute pushes received, in order
        pub async fn pushes(&self) -> Vec<(AccountId, Attributes)> {
            self.pushes.read().await.clone()
        }
    }

    impl DomainPort for MockAccountLinks {}

    #[async_trait]
    impl AccountLinkPort for MockAccountLinks {
        async fn linked_contact_id(&self, account_id: AccountId) -> Result<Option<ContactId>, PortError> {
            Ok(self.links.read().await.get(&account_id).cloned())
        }

        async fn link_contact(&self, account_id: AccountId, contact_id: &ContactId) -> Result<(), PortError> {
            self.links.write().await.insert(account_id, contact_id.clone());
            Ok(())
        }

        async fn push_attributes(&self, account_id: AccountId, attributes: &Attributes) -> Result<(), PortError> {
            self.pushes.write().await.push((account_id, attributes.clone()));
            Ok(())
        }
    }

    /// In-memory per-item tag settings counting lookups
    #[derive(Debug, Default)]
    pub struct MockTagConfig {
        configs: RwLock<HashMap<ItemId, ItemTagConfig>>,
        lookups: AtomicUsize,
    }

    impl MockTagConfig {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set(&self, item_id: ItemId, apply_tags: Vec<core_kernel::TagId>) {
            self.configs
                .write()
                .await
                .insert(item_id, ItemTagConfig { apply_tags });
        }

        pub async fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for MockTagConfig {}

    #[async_trait]
    impl TagConfigPort for MockTagConfig {
        async fn tag_config(&self, item_id: ItemId) -> Result<Option<ItemTagConfig>, PortError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.configs.read().await.get(&item_id).cloned())
        }
    }

    #[derive(Debug, Clone)]
    struct StoredEntity<E> {
        entity: E,
        processed: bool,
        contact_id: Option<ContactId>,
        notes: Vec<String>,
    }

    /// In-memory entity store keyed (and therefore ordered) by entity id
    #[derive(Debug)]
    pub struct MockEntityStore<E> {
        entities: RwLock<BTreeMap<EntityId, StoredEntity<E>>>,
    }

    impl<E> Default for MockEntityStore<E> {
        fn default() -> Self {
            Self {
                entities: RwLock::new(BTreeMap::new()),
            }
        }
    }

    impl<E: SourceEntity + Clone> MockEntityStore<E> {
        pub fn new() -> Self {
            Self::default()
        }

        /// Inserts or replaces an entity, resetting its sync state
        pub async fn insert(&self, entity: E) {
            let id = entity.id();
            self.entities.write().await.insert(
                id,
                StoredEntity {
                    entity,
                    processed: false,
                    contact_id: None,
                    notes: Vec::new(),
                },
            );
        }

        /// Inserts an entity that was already synced earlier
        pub async fn insert_processed(&self, entity: E, contact_id: Option<ContactId>) {
            let id = entity.id();
            self.entities.write().await.insert(
                id,
                StoredEntity {
                    entity,
                    processed: true,
                    contact_id,
                    notes: Vec::new(),
                },
            );
        }

        pub async fn notes(&self, id: EntityId) -> Vec<String> {
            self.entities
                .read()
                .await
                .get(&id)
                .map(|s| s.notes.clone())
                .unwrap_or_default()
        }

        pub async fn len(&self) -> usize {
            self.entities.read().await.len()
        }
    }

    impl<E: Send + Sync + 'static> DomainPort for MockEntityStore<E> {}

    #[async_trait]
    impl<E: SourceEntity + Clone + 'static> EntityStore<E> for MockEntityStore<E> {
        async fn get(&self, id: EntityId) -> Result<E, PortError> {
            self.entities
                .read()
                .await
                .get(&id)
                .map(|s| s.entity.clone())
                .ok_or_else(|| PortError::not_found("Entity", id))
        }

        async fn save(&self, entity: E) -> Result<(), PortError> {
            let mut entities = self.entities.write().await;
            match entities.get_mut(&entity.id()) {
                Some(stored) => stored.entity = entity,
                None => {
                    entities.insert(
                        entity.id(),
                        StoredEntity {
                            entity,
                            processed: false,
                            contact_id: None,
                            notes: Vec::new(),
                        },
                    );
                }
            }
            Ok(())
        }

        async fn is_processed(&self, id: EntityId) -> Result<bool, PortError> {
            Ok(self
                .entities
                .read()
                .await
                .get(&id)
                .map(|s| s.processed)
                .unwrap_or(false))
        }

        async fn set_processed(&self, id: EntityId) -> Result<(), PortError> {
            let mut entities = self.entities.write().await;
            let stored = entities.get_mut(&id).ok_or_else(|| PortError::not_found("Entity", id))?;
            stored.processed = true;
            Ok(())
        }

        async fn append_audit_note(&self, id: EntityId, note: &str) -> Result<(), PortError> {
            let mut entities = self.entities.write().await;
            let stored = entities.get_mut(&id).ok_or_else(|| PortError::not_found("Entity", id))?;
            stored.notes.push(note.to_string());
            Ok(())
        }

        async fn store_contact_id(&self, id: EntityId, contact_id: &ContactId) -> Result<(), PortError> {
            let mut entities = self.entities.write().await;
            let stored = entities.get_mut(&id).ok_or_else(|| PortError::not_found("Entity", id))?;
            stored.contact_id = Some(contact_id.clone());
            Ok(())
        }

        async fn contact_id(&self, id: EntityId) -> Result<Option<ContactId>, PortError> {
            Ok(self
                .entities
                .read()
                .await
                .get(&id)
                .and_then(|s| s.contact_id.clone()))
        }

        async fn pending(&self) -> Result<Vec<EntityId>, PortError> {
            Ok(self
                .entities
                .read()
                .await
                .iter()
                .filter(|(_, s)| !s.processed)
                .map(|(id, _)| *id)
                .collect())
        }
    }
}
