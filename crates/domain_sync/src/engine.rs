//! Contact Sync Engine
//!
//! Pushes one source entity to the CRM: resolves who the contact is, builds
//! the contact record, creates or updates the contact, applies tags and
//! records the outcome on the entity.
//!
//! # Idempotency
//!
//! The entity's processed-flag is checked before anything else and set only
//! once the whole sync succeeded (or the identity turned out to be missing,
//! which no retry can fix). A failed contact upsert or tag application
//! leaves the flag unset so the batch reconciler picks the entity up again.
//!
//! The flag is a coarse guard, not a lock: two triggers racing on the same
//! entity may both sync it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::{ContactId, OperationMetadata, PortError};

use crate::config::SyncConfig;
use crate::contact::{order_attributes, ContactRecord, Identity};
use crate::entity::SourceEntity;
use crate::error::SyncError;
use crate::field_mapping::FieldMapping;
use crate::field_registry::is_email;
use crate::hooks::{DefaultHooks, SyncHooks};
use crate::ports::{AccountLinkPort, CrmContactPort, EntityStore, TagConfigPort};
use crate::tags::{TagResolver, TagSet};

/// Result of a successful `sync_contact` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The contact was created or updated and the tags applied
    Synced { contact_id: ContactId, tags: TagSet },
    /// The entity was already processed; nothing was sent to the CRM
    AlreadyProcessed,
}

impl SyncOutcome {
    pub fn contact_id(&self) -> Option<&ContactId> {
        match self {
            SyncOutcome::Synced { contact_id, .. } => Some(contact_id),
            SyncOutcome::AlreadyProcessed => None,
        }
    }
}

/// Result of a successful `reverse_sync` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReverseOutcome {
    /// The line-item tags were removed from the contact
    Removed { contact_id: ContactId, tags: TagSet },
    /// None of the line items carry tags
    NothingToRemove,
    /// The entity was never synced to a contact
    NoContact,
}

/// Syncs source entities of one kind to CRM contacts
pub struct ContactSyncEngine<E> {
    crm: Arc<dyn CrmContactPort>,
    accounts: Arc<dyn AccountLinkPort>,
    tags: TagResolver,
    store: Arc<dyn EntityStore<E>>,
    hooks: Arc<dyn SyncHooks<E>>,
}

impl<E> Clone for ContactSyncEngine<E> {
    fn clone(&self) -> Self {
        Self {
            crm: Arc::clone(&self.crm),
            accounts: Arc::clone(&self.accounts),
            tags: self.tags.clone(),
            store: Arc::clone(&self.store),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<E> fmt::Debug for ContactSyncEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactSyncEngine")
            .field("crm", &self.crm.name())
            .finish_non_exhaustive()
    }
}

impl<E: SourceEntity + 'static> ContactSyncEngine<E> {
    pub fn new(
        crm: Arc<dyn CrmContactPort>,
        accounts: Arc<dyn AccountLinkPort>,
        tag_config: Arc<dyn TagConfigPort>,
        store: Arc<dyn EntityStore<E>>,
    ) -> Self {
        Self {
            crm,
            accounts,
            tags: TagResolver::new(tag_config),
            store,
            hooks: Arc::new(DefaultHooks),
        }
    }

    /// Replaces the pass-through hooks
    pub fn with_hooks(mut self, hooks: Arc<dyn SyncHooks<E>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore<E>> {
        &self.store
    }

    pub fn crm(&self) -> &Arc<dyn CrmContactPort> {
        &self.crm
    }

    /// Creates or updates the entity's contact and applies its tags
    ///
    /// # Errors
    ///
    /// - [`SyncError::IdentityMissing`] if neither an account nor an email
    ///   can be resolved; the entity is marked processed
    /// - [`SyncError::CrmSync`] if the contact upsert fails
    /// - [`SyncError::TagApply`] if tagging fails; the contact id stays
    ///   stored but the entity is not marked processed
    /// - [`SyncError::Store`] if a collaborator store fails
    #[instrument(
        skip(self, entity, mapping, config),
        fields(entity_id = %entity.id(), kind = entity.kind().label(), integration = %config.integration)
    )]
    pub async fn sync_contact(
        &self,
        entity: &E,
        mapping: &FieldMapping,
        config: &SyncConfig,
    ) -> Result<SyncOutcome, SyncError> {
        let id = entity.id();

        if self.store.is_processed(id).await? {
            debug!("Entity already processed, skipping");
            return Ok(SyncOutcome::AlreadyProcessed);
        }

        let metadata = OperationMetadata::for_integration(config.integration.clone())
            .with_context("entity_id", id.to_string());

        let source = entity.source_fields();
        let Some(identity) = self.resolve_identity(entity, mapping, config, &source) else {
            let label = entity_label(entity);
            error!("No email or account found for {}, unable to sync", label);
            self.store.set_processed(id).await?;
            self.store
                .append_audit_note(id, "Unable to sync to CRM: no email address or user account found.")
                .await?;
            return Err(SyncError::identity_missing(label));
        };

        let mut attributes = mapping.apply(&source);
        if let Some(summary) = entity.order_summary() {
            attributes.extend(order_attributes(&summary, entity.customer_note().as_deref()));
        }
        let attributes = self.hooks.customer_data(entity, attributes);

        let mut record = ContactRecord::new(identity, attributes);
        let resolved = self.tags.resolve(&config.apply_tags, &entity.line_items()).await?;
        record.tags = self.hooks.apply_tags(entity, resolved);

        let contact_id = match self.upsert(&record, config, &metadata).await {
            Ok(contact_id) => contact_id,
            Err(source) => {
                error!(identity = %record.identity, error = %source, "Error creating or updating contact");
                self.store
                    .append_audit_note(id, &format!("Error creating contact in {}: {}", self.crm.name(), source))
                    .await?;
                return Err(SyncError::CrmSync { source });
            }
        };

        self.store.store_contact_id(id, &contact_id).await?;
        self.store
            .append_audit_note(
                id,
                &format!("Customer synced to contact ID {} in {}.", contact_id, self.crm.name()),
            )
            .await?;

        if !record.tags.is_empty() {
            let applied = self
                .crm
                .apply_tags(&record.tags, &contact_id, Some(metadata.clone()))
                .await;
            if let Err(source) = applied {
                error!(contact_id = %contact_id, tags = %record.tags, error = %source, "Error applying tags");
                self.store
                    .append_audit_note(
                        id,
                        &format!("Error applying tags {} to contact ID {}: {}", record.tags, contact_id, source),
                    )
                    .await?;
                return Err(SyncError::TagApply {
                    contact_id,
                    tags: record.tags,
                    source,
                });
            }
        }

        self.store.set_processed(id).await?;
        self.hooks.on_complete(entity, &contact_id);

        let note = match self.crm.contact_edit_url(&contact_id) {
            Some(url) => format!(
                "{} sync complete for contact ID {}: {}",
                self.crm.name(),
                contact_id,
                url
            ),
            None => format!("{} sync complete for contact ID {}.", self.crm.name(), contact_id),
        };
        self.store.append_audit_note(id, &note).await?;

        info!(contact_id = %contact_id, tags = %record.tags, "Entity synced to CRM");

        Ok(SyncOutcome::Synced {
            contact_id,
            tags: record.tags,
        })
    }

    /// Removes the line-item tags of a reversed entity (refund)
    ///
    /// Global tags are left alone and contact attributes are never touched.
    #[instrument(skip(self, entity), fields(entity_id = %entity.id(), kind = entity.kind().label()))]
    pub async fn reverse_sync(&self, entity: &E) -> Result<ReverseOutcome, SyncError> {
        let tags = self.tags.resolve(&TagSet::new(), &entity.line_items()).await?;
        if tags.is_empty() {
            debug!("No line-item tags to remove");
            return Ok(ReverseOutcome::NothingToRemove);
        }

        let contact_id = match self.hooks.account_id(entity, entity.account_id()) {
            Some(account_id) => self.accounts.linked_contact_id(account_id).await?,
            None => self.store.contact_id(entity.id()).await?,
        };
        let Some(contact_id) = contact_id else {
            warn!(tags = %tags, "No contact found, tags not removed");
            return Ok(ReverseOutcome::NoContact);
        };

        let metadata = OperationMetadata::default().with_context("entity_id", entity.id().to_string());
        let removed = self.crm.remove_tags(&tags, &contact_id, Some(metadata)).await;
        if let Err(source) = removed {
            error!(contact_id = %contact_id, tags = %tags, error = %source, "Error removing tags");
            return Err(SyncError::TagRemove {
                contact_id,
                tags,
                source,
            });
        }

        self.store
            .append_audit_note(
                entity.id(),
                &format!("Removed tags {} from contact ID {} in {}.", tags, contact_id, self.crm.name()),
            )
            .await?;
        info!(contact_id = %contact_id, tags = %tags, "Line-item tags removed");

        Ok(ReverseOutcome::Removed { contact_id, tags })
    }

    fn resolve_identity(
        &self,
        entity: &E,
        mapping: &FieldMapping,
        config: &SyncConfig,
        source: &core_kernel::Attributes,
    ) -> Option<Identity> {
        let account_id = self.hooks.account_id(entity, entity.account_id());
        let email = entity
            .billing_email()
            .filter(|e| is_email(e))
            .map(|e| e.trim().to_string())
            .or_else(|| mapping.extract_email(source, &config.lookup_field));
        let email = self.hooks.billing_email(entity, email);
        Identity::resolve(account_id, email)
    }

    /// Creates or updates the contact, returning its id
    async fn upsert(
        &self,
        record: &ContactRecord,
        config: &SyncConfig,
        metadata: &OperationMetadata,
    ) -> Result<ContactId, PortError> {
        let Identity::Account { account_id, email } = &record.identity else {
            return self.upsert_by_email(record, config, metadata).await;
        };

        let linked = self.accounts.linked_contact_id(*account_id).await?;
        if let (true, Some(contact_id)) = (config.add_only, &linked) {
            debug!(contact_id = %contact_id, "Add-only mode, account already linked");
            return Ok(contact_id.clone());
        }

        self.accounts.push_attributes(*account_id, &record.attributes).await?;
        if let Some(contact_id) = linked {
            return Ok(contact_id);
        }

        // Account exists but was never linked to a contact
        if email.is_none() {
            return Err(PortError::not_found("Contact", format!("user #{}", account_id)));
        }
        let contact_id = self.upsert_by_email(record, config, metadata).await?;
        self.accounts.link_contact(*account_id, &contact_id).await?;
        Ok(contact_id)
    }

    async fn upsert_by_email(
        &self,
        record: &ContactRecord,
        config: &SyncConfig,
        metadata: &OperationMetadata,
    ) -> Result<ContactId, PortError> {
        if config.add_only {
            if let Some(email) = record.identity.email() {
                if let Some(existing) = self.crm.find_by_identity(email, Some(metadata.clone())).await? {
                    debug!(contact_id = %existing, "Add-only mode, contact already exists");
                    return Ok(existing);
                }
            }
        }
        self.crm
            .create_or_update_by_identity(record, Some(metadata.clone()))
            .await
    }
}

fn entity_label<E: SourceEntity>(entity: &E) -> String {
    format!("{} #{}", entity.kind().label(), entity.id())
}
