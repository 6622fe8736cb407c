//! Catalog DTOs

use serde::Serialize;

use domain_integrations::{IntegrationExport, IntegrationSetting};
use domain_sync::{FieldDescriptor, FieldGroup, FieldRegistry};

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub crm_name: String,
    pub settings: Vec<IntegrationSetting>,
}

#[derive(Debug, Serialize)]
pub struct FieldCatalogResponse {
    pub groups: Vec<FieldGroup>,
    pub fields: Vec<FieldDescriptor>,
}

impl From<FieldRegistry> for FieldCatalogResponse {
    fn from(registry: FieldRegistry) -> Self {
        Self {
            groups: registry.groups().cloned().collect(),
            fields: registry.fields().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportsResponse {
    pub exports: Vec<IntegrationExport>,
}
