//! Ports and Adapters Infrastructure
//!
//! This module provides the foundational types shared by every collaborator
//! port in the sync core. The sync engine only ever talks to traits; the CRM
//! client, the account link store, the per-item tag configuration and the
//! entity store are all adapters supplied by the host platform.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Integrations / Event Handlers               │
//! │           (ecommerce, forms, membership, batch)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Port Traits                             │
//! │  (CrmContactPort, AccountLinkPort, TagConfigPort,            │
//! │   EntityStore)  defined in domain_sync                       │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  Platform Adapter │     │  In-memory mock  │
//!         │  (host CRM layer) │     │  (tests, dev)    │
//!         └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait CrmContactPort: DomainPort {
//!     async fn apply_tags(&self, tags: &TagSet, contact: &ContactId) -> Result<(), PortError>;
//! }
//! ```

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error type for port operations
///
/// Provides a unified error type that all port implementations must use,
/// so the engine can classify collaborator failures the same way regardless
/// of which CRM sits behind the facade.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The CRM refused the operation
    #[error("Rejected by CRM: {message}")]
    Rejected {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Validation error with field information
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a Rejected error
    pub fn rejected(message: impl Into<String>) -> Self {
        PortError::Rejected {
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker trait for all collaborator ports
///
/// All port traits extend this marker so they can be shared behind `Arc`
/// across async handlers.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Adapter is healthy and operational
    Healthy,
    /// Adapter is degraded but operational
    Degraded,
    /// Adapter is unhealthy and not operational
    Unhealthy,
    /// Health status is unknown
    Unknown,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Adapter identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    async fn health_check(&self) -> HealthCheckResult;
}

/// Metadata about a sync operation for auditing and tracing
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    /// Correlation ID for tracing one event across collaborators
    pub correlation_id: Option<String>,
    /// Integration slug that initiated the operation
    pub initiated_by: Option<String>,
    /// Additional context as key-value pairs
    pub context: std::collections::HashMap<String, String>,
}

impl OperationMetadata {
    /// Creates metadata for an integration with a fresh time-ordered correlation ID
    pub fn for_integration(slug: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(Uuid::now_v7().to_string()),
            initiated_by: Some(slug.into()),
            ..Default::default()
        }
    }

    /// Adds context to the metadata
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_not_found() {
        let error = PortError::not_found("Order", 501);
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("Order"));
        assert!(error.to_string().contains("501"));
    }

    #[test]
    fn test_port_error_transient() {
        assert!(PortError::connection("CRM API unreachable").is_transient());

        let rejected = PortError::rejected("Unknown tag");
        assert!(!rejected.is_transient());
    }

    #[test]
    fn test_operation_metadata() {
        let metadata = OperationMetadata::default().with_context("order_id", "501");

        assert!(metadata.correlation_id.is_none());
        assert_eq!(metadata.context.get("order_id"), Some(&"501".to_string()));
    }

    #[test]
    fn test_metadata_for_integration() {
        let metadata = OperationMetadata::for_integration("my-ecommerce-plugin");
        assert_eq!(metadata.initiated_by.as_deref(), Some("my-ecommerce-plugin"));
        assert!(metadata.correlation_id.is_some());
    }
}
