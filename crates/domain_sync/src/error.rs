//! Sync errors
//!
//! Every failure the sync core can report. None of these ever propagates to
//! the platform event source: the integration registry converts them into
//! logged reports.

use thiserror::Error;

use core_kernel::{ContactId, PortError};

use crate::tags::TagSet;

/// Errors that can occur while syncing an entity to the CRM
#[derive(Debug, Error)]
pub enum SyncError {
    /// Neither an email nor a linked account could be resolved
    ///
    /// Terminal: the entity is marked processed so it is not retried.
    #[error("No email or account found for {entity}, unable to sync")]
    IdentityMissing { entity: String },

    /// The CRM refused or failed the contact create/update
    #[error("Error creating or updating contact: {source}")]
    CrmSync {
        #[source]
        source: PortError,
    },

    /// The contact was stored but the tags could not be applied
    #[error("Error applying tags {tags} to contact {contact_id}: {source}")]
    TagApply {
        contact_id: ContactId,
        tags: TagSet,
        #[source]
        source: PortError,
    },

    /// Tags could not be removed on reversal
    #[error("Error removing tags {tags} from contact {contact_id}: {source}")]
    TagRemove {
        contact_id: ContactId,
        tags: TagSet,
        #[source]
        source: PortError,
    },

    /// The entity store, account links or tag settings failed
    #[error("Store error: {0}")]
    Store(#[from] PortError),

    /// The event payload cannot be handled
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The integration does not offer the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl SyncError {
    pub fn identity_missing(entity: impl Into<String>) -> Self {
        SyncError::IdentityMissing {
            entity: entity.into(),
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        SyncError::InvalidEvent(message.into())
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        SyncError::Unsupported(operation.into())
    }

    /// Returns true if a later batch run may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::CrmSync { .. } | SyncError::TagApply { .. } | SyncError::TagRemove { .. } => true,
            SyncError::Store(source) => source.is_transient(),
            SyncError::IdentityMissing { .. }
            | SyncError::InvalidEvent(_)
            | SyncError::Unsupported(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_missing_is_terminal() {
        let error = SyncError::identity_missing("order #501");
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "No email or account found for order #501, unable to sync");
    }

    #[test]
    fn test_tag_apply_message_lists_tags() {
        let error = SyncError::TagApply {
            contact_id: ContactId::new("42"),
            tags: ["T1", "T2"].into_iter().map(core_kernel::TagId::from).collect(),
            source: PortError::rejected("invalid tag"),
        };
        assert!(error.is_retryable());
        assert!(error.to_string().contains("[T1, T2]"));
        assert!(error.to_string().contains("42"));
    }

    #[test]
    fn test_store_error_retry_follows_port_error() {
        assert!(SyncError::from(PortError::connection("down")).is_retryable());
        assert!(!SyncError::from(PortError::not_found("Entity", 1)).is_retryable());
    }
}
