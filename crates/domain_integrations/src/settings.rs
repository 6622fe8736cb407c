//! Settings, field catalog and export contributions
//!
//! Integrations describe the settings they add to the admin screens and the
//! batch operations they offer as plain data; rendering is left to the host.

use serde::{Deserialize, Serialize};

/// Settings section every integration contributes to
pub const INTEGRATIONS_SECTION: &str = "integrations";

/// Input kind of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKind {
    Heading,
    Checkbox,
    /// Multi-select of CRM tags
    AssignTags,
    Text,
}

/// A setting contributed by an integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDescriptor {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub section: String,
}

impl SettingDescriptor {
    pub fn new(key: impl Into<String>, title: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            desc: None,
            kind,
            section: INTEGRATIONS_SECTION.to_string(),
        }
    }

    pub fn heading(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(key, title, SettingKind::Heading)
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

/// A batch operation listed on the export screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOption {
    /// Operation key, also used in the batch routes
    pub key: String,
    pub label: String,
    pub title: String,
    pub tooltip: String,
}
