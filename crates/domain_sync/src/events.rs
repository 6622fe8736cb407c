//! Platform events
//!
//! The events integrations subscribe to. Events are immutable; each one
//! names the source entity it concerns and when it happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, Attributes, EntityId, FeedId, FormId};

/// Kind of platform event, used to route events to integrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrderCompleted,
    OrderRefunded,
    FormSubmitted,
    UserRegistered,
    UserUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCompleted => "order_completed",
            EventKind::OrderRefunded => "order_refunded",
            EventKind::FormSubmitted => "form_submitted",
            EventKind::UserRegistered => "user_registered",
            EventKind::UserUpdated => "user_updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    OrderCompleted {
        order_id: EntityId,
    },
    OrderRefunded {
        order_id: EntityId,
    },
    FormSubmitted {
        form_id: FormId,
        feed_id: FeedId,
        entry_id: EntityId,
        /// Logged-in user who submitted the form, if any
        #[serde(default)]
        account_id: Option<AccountId>,
        /// Submitted values keyed by form field id
        fields: Attributes,
    },
    UserRegistered {
        account_id: AccountId,
        /// Posted profile fields
        #[serde(default)]
        fields: Attributes,
    },
    UserUpdated {
        account_id: AccountId,
        #[serde(default)]
        fields: Attributes,
    },
}

/// A platform event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub payload: EventPayload,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
}

impl SyncEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            occurred_at: Utc::now(),
        }
    }

    pub fn order_completed(order_id: EntityId) -> Self {
        Self::new(EventPayload::OrderCompleted { order_id })
    }

    pub fn order_refunded(order_id: EntityId) -> Self {
        Self::new(EventPayload::OrderRefunded { order_id })
    }

    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::OrderCompleted { .. } => EventKind::OrderCompleted,
            EventPayload::OrderRefunded { .. } => EventKind::OrderRefunded,
            EventPayload::FormSubmitted { .. } => EventKind::FormSubmitted,
            EventPayload::UserRegistered { .. } => EventKind::UserRegistered,
            EventPayload::UserUpdated { .. } => EventKind::UserUpdated,
        }
    }

    /// The source entity the event concerns (users are keyed by account id)
    pub fn entity_id(&self) -> EntityId {
        match &self.payload {
            EventPayload::OrderCompleted { order_id } | EventPayload::OrderRefunded { order_id } => *order_id,
            EventPayload::FormSubmitted { entry_id, .. } => *entry_id,
            EventPayload::UserRegistered { account_id, .. } | EventPayload::UserUpdated { account_id, .. } => {
                EntityId::new(account_id.get())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::FieldValue;

    #[test]
    fn test_deserialize_form_submission() {
        let json = r#"{
            "payload": {
                "kind": "form_submitted",
                "form_id": 3,
                "feed_id": 1,
                "entry_id": 77,
                "fields": {"1": "Jane", "2": "jane@example.com"}
            },
            "occurred_at": "2024-05-01T12:00:00Z"
        }"#;
        let event: SyncEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.kind(), EventKind::FormSubmitted);
        assert_eq!(event.entity_id(), EntityId::new(77));
        match event.payload {
            EventPayload::FormSubmitted { fields, account_id, .. } => {
                assert!(account_id.is_none());
                assert_eq!(fields.get("1"), Some(&FieldValue::text("Jane")));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_defaults_to_now() {
        let before = Utc::now();
        let event: SyncEvent =
            serde_json::from_str(r#"{"payload": {"kind": "order_refunded", "order_id": 502}}"#).unwrap();
        assert!(event.occurred_at >= before);
        assert_eq!(event.kind().to_string(), "order_refunded");
    }

    #[test]
    fn test_user_events_use_account_as_entity() {
        let event = SyncEvent::new(EventPayload::UserRegistered {
            account_id: AccountId::new(12),
            fields: Attributes::new(),
        });
        assert_eq!(event.entity_id(), EntityId::new(12));
    }
}
