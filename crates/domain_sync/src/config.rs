//! Per-integration sync configuration
//!
//! Settings that used to be read from global site options are resolved by
//! a [`ConfigProvider`] and handed to the engine on every call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tags::TagSet;

/// CRM field used to find existing contacts when none is configured
pub const DEFAULT_LOOKUP_FIELD: &str = "email";

fn default_lookup_field() -> String {
    DEFAULT_LOOKUP_FIELD.to_string()
}

/// Sync settings for one integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Integration slug, carried into operation metadata
    #[serde(default)]
    pub integration: String,
    /// Tags applied to every synced contact
    #[serde(default)]
    pub apply_tags: TagSet,
    /// Only create contacts, never update existing ones
    #[serde(default)]
    pub add_only: bool,
    /// CRM field used to find existing contacts
    #[serde(default = "default_lookup_field")]
    pub lookup_field: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            integration: String::new(),
            apply_tags: TagSet::new(),
            add_only: false,
            lookup_field: default_lookup_field(),
        }
    }
}

impl SyncConfig {
    pub fn for_integration(slug: impl Into<String>) -> Self {
        Self {
            integration: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I: IntoIterator<Item = core_kernel::TagId>>(mut self, tags: I) -> Self {
        self.apply_tags.extend(tags);
        self
    }

    pub fn add_only(mut self, add_only: bool) -> Self {
        self.add_only = add_only;
        self
    }

    pub fn with_lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = field.into();
        self
    }
}

/// Resolves the sync configuration of an integration
pub trait ConfigProvider: Send + Sync {
    fn sync_config(&self, integration: &str) -> SyncConfig;
}

/// Configuration fixed at startup
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    lookup_field: Option<String>,
    integrations: HashMap<String, SyncConfig>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CRM lookup field for integrations without their own
    pub fn with_lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = Some(field.into());
        self
    }

    pub fn with_integration(mut self, slug: impl Into<String>, config: SyncConfig) -> Self {
        let slug = slug.into();
        let config = SyncConfig {
            integration: slug.clone(),
            ..config
        };
        self.integrations.insert(slug, config);
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn sync_config(&self, integration: &str) -> SyncConfig {
        self.integrations.get(integration).cloned().unwrap_or_else(|| {
            let config = SyncConfig::for_integration(integration);
            match &self.lookup_field {
                Some(field) => config.with_lookup_field(field.clone()),
                None => config,
            }
        })
    }
}
