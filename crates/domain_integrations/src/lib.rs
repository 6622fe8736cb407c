//! Plugin Integrations
//!
//! Each supported plugin gets an [`Integration`] that translates its events
//! into sync engine calls and contributes settings, syncable fields and
//! batch operations:
//!
//! - **Ecommerce** (`my-ecommerce-plugin`): order completed / refunded
//! - **Forms** (`my-forms-plugin`): form submissions through feeds
//! - **Membership** (`my-membership-plugin`): registration and profile updates
//!
//! The [`IntegrationRegistry`] routes events to the integrations subscribed
//! to them.

pub mod settings;
pub mod integration;
pub mod ecommerce;
pub mod forms;
pub mod membership;
pub mod registry;

pub use settings::{ExportOption, SettingDescriptor, SettingKind, INTEGRATIONS_SECTION};
pub use integration::{HandleOutcome, Integration};
pub use ecommerce::{billing_field_mapping, EcommerceIntegration, Order};
pub use forms::{FeedSettings, FeedSettingsPort, FieldMapSetting, FormEntry, FormsIntegration, InMemoryFeedSettings};
pub use membership::{posted_field_mapping, CustomField, MembershipIntegration};
pub use registry::{HandlerReport, HandlerStatus, IntegrationExport, IntegrationRegistry, IntegrationSetting};
