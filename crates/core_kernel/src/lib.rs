//! Core Kernel - Foundational types for the CRM sync core
//!
//! This crate provides the building blocks shared by every other crate:
//! - Typed identifiers for plugin-side and CRM-side records
//! - Scalar attribute values
//! - The port error type and marker traits for collaborator adapters

pub mod identifiers;
pub mod value;
pub mod ports;

pub use identifiers::{EntityId, AccountId, ItemId, FormId, FeedId, ContactId, TagId};
pub use value::{FieldValue, Attributes};
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
    OperationMetadata,
};
