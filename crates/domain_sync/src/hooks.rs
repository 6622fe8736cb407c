//! Sync hooks
//!
//! Typed extension points integrations use to adjust a sync in flight. Every
//! hook defaults to passing its input through unchanged.

use core_kernel::{AccountId, Attributes, ContactId};

use crate::tags::TagSet;

/// Extension points called by the contact sync engine
pub trait SyncHooks<E>: Send + Sync {
    /// Adjusts the email used to identify the contact
    fn billing_email(&self, _entity: &E, email: Option<String>) -> Option<String> {
        email
    }

    /// Adjusts the site account the entity belongs to
    fn account_id(&self, _entity: &E, account_id: Option<AccountId>) -> Option<AccountId> {
        account_id
    }

    /// Adjusts the attributes sent to the CRM
    fn customer_data(&self, _entity: &E, attributes: Attributes) -> Attributes {
        attributes
    }

    /// Adjusts the tags applied after the contact is synced
    fn apply_tags(&self, _entity: &E, tags: TagSet) -> TagSet {
        tags
    }

    /// Called once the entity is marked processed
    fn on_complete(&self, _entity: &E, _contact_id: &ContactId) {}
}

/// Hooks that change nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<E> SyncHooks<E> for DefaultHooks {}
