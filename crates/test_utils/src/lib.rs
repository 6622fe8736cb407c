//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the CRM
//! sync test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed ids, tags and emails used across scenarios
//! - `builders`: Builder patterns for orders, form entries and events
//! - `harness`: In-memory collaborators wired into engines and a registry
//! - `assertions`: Custom assertion helpers for sync results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
