//! Membership integration
//!
//! Copies the fields posted on registration and profile update forms into
//! their contact field keys and pushes them against the user's account. New
//! registrations also get the configured membership tags.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use core_kernel::{AccountId, Attributes, ContactId, OperationMetadata};
use domain_sync::{
    is_email, AccountLinkPort, ConfigProvider, ContactRecord, CrmContactPort, EventKind, EventPayload,
    FieldDescriptor, FieldGroup, FieldMapping, FieldType, Identity, SyncError, SyncEvent, TagSet,
};

use crate::ecommerce::plugin_meta_fields;
use crate::integration::{HandleOutcome, Integration};
use crate::settings::{SettingDescriptor, SettingKind};

pub const SLUG: &str = "my-membership-plugin";
pub const NAME: &str = "My Membership Plugin";

const SUBSCRIPTIONS: &[EventKind] = &[EventKind::UserRegistered, EventKind::UserUpdated];

/// Posted form keys to contact field keys
pub fn posted_field_mapping() -> FieldMapping {
    FieldMapping::new()
        .map("username", "user_login")
        .map_typed("password", "user_pass", FieldType::Password)
        .map_typed("email", "user_email", FieldType::Email)
        .map("custom-posted-field", "meta_field_key")
        .map("custom-calc-field", "pseudo_field_key")
        .map_typed("vendor-telephone", "phone_number", FieldType::Phone)
}

/// A custom field defined in the membership plugin's own settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// The membership plugin integration
#[derive(Clone)]
pub struct MembershipIntegration {
    crm: Arc<dyn CrmContactPort>,
    accounts: Arc<dyn AccountLinkPort>,
    config: Arc<dyn ConfigProvider>,
    custom_fields: Vec<CustomField>,
}

impl MembershipIntegration {
    pub fn new(
        crm: Arc<dyn CrmContactPort>,
        accounts: Arc<dyn AccountLinkPort>,
        config: Arc<dyn ConfigProvider>,
    ) -> Self {
        Self {
            crm,
            accounts,
            config,
            custom_fields: Vec::new(),
        }
    }

    pub fn with_custom_fields(mut self, custom_fields: Vec<CustomField>) -> Self {
        self.custom_fields = custom_fields;
        self
    }

    /// Pushes posted profile fields, tagging the contact on registration
    #[instrument(skip(self, posted), fields(integration = SLUG, account_id = %account_id))]
    pub async fn user_register(
        &self,
        account_id: AccountId,
        posted: &Attributes,
        registration: bool,
    ) -> Result<HandleOutcome, SyncError> {
        let attributes = posted_field_mapping().apply(posted);
        self.accounts
            .push_attributes(account_id, &attributes)
            .await
            .map_err(|source| SyncError::CrmSync { source })?;

        let mut contact_id = self.accounts.linked_contact_id(account_id).await?;
        let tags = if registration {
            self.config.sync_config(SLUG).apply_tags
        } else {
            TagSet::new()
        };

        if registration && contact_id.is_none() {
            contact_id = self.create_contact(account_id, &attributes).await?;
            if contact_id.is_none() && !tags.is_empty() {
                warn!(tags = %tags, "No contact or valid email for new account, registration tags dropped");
                return Err(SyncError::identity_missing(format!("user #{}", account_id)));
            }
        }

        if let (Some(contact), false) = (&contact_id, tags.is_empty()) {
            let metadata = OperationMetadata::for_integration(SLUG);
            let applied = self.crm.apply_tags(&tags, contact, Some(metadata)).await;
            if let Err(source) = applied {
                error!(contact_id = %contact, tags = %tags, error = %source, "Error applying registration tags");
                return Err(SyncError::TagApply {
                    contact_id: contact.clone(),
                    tags,
                    source,
                });
            }
        }

        info!(contact_id = ?contact_id, tags = %tags, registration, "Profile fields synced");
        Ok(HandleOutcome::ProfilePush {
            account_id,
            contact_id,
            tags,
        })
    }

    /// Creates the contact for a new account that has none linked yet
    async fn create_contact(
        &self,
        account_id: AccountId,
        attributes: &Attributes,
    ) -> Result<Option<ContactId>, SyncError> {
        let email = attributes
            .get("user_email")
            .and_then(|v| v.as_text())
            .filter(|e| is_email(e))
            .map(str::to_string);
        let Some(email) = email else {
            return Ok(None);
        };

        let record = ContactRecord::new(
            Identity::Account {
                account_id,
                email: Some(email),
            },
            attributes.clone(),
        );
        let contact_id = self
            .crm
            .create_or_update_by_identity(&record, Some(OperationMetadata::for_integration(SLUG)))
            .await
            .map_err(|source| SyncError::CrmSync { source })?;
        self.accounts.link_contact(account_id, &contact_id).await?;
        Ok(Some(contact_id))
    }
}

#[async_trait]
impl Integration for MembershipIntegration {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        SUBSCRIPTIONS
    }

    async fn handle(&self, event: &SyncEvent) -> Result<HandleOutcome, SyncError> {
        match &event.payload {
            EventPayload::UserRegistered { account_id, fields } => {
                self.user_register(*account_id, fields, true).await
            }
            EventPayload::UserUpdated { account_id, fields } => {
                self.user_register(*account_id, fields, false).await
            }
            _ => Ok(HandleOutcome::Ignored),
        }
    }

    fn settings(&self, crm_name: &str) -> Vec<SettingDescriptor> {
        vec![
            SettingDescriptor::heading("my_plugin_header", "My Plugin Name"),
            SettingDescriptor::new("my_plugin_checkbox", "Checkbox Option", SettingKind::Checkbox)
                .with_desc(format!("Check this checkbox to do something in {}.", crm_name)),
            SettingDescriptor::new("my_plugin_apply_tags", "Apply Tags", SettingKind::AssignTags)
                .with_desc(format!("Apply these tags in {} when something happens.", crm_name)),
            SettingDescriptor::new("my_plugin_text", "Text Option", SettingKind::Text)
                .with_desc("This will be saved as text."),
        ]
    }

    fn field_group(&self) -> Option<FieldGroup> {
        Some(FieldGroup::new(SLUG, "My Plugin Name"))
    }

    fn meta_fields(&self) -> Vec<FieldDescriptor> {
        let mut fields: Vec<FieldDescriptor> = self
            .custom_fields
            .iter()
            .map(|f| FieldDescriptor::new(f.key.clone(), f.name.clone(), f.field_type, SLUG))
            .collect();
        fields.extend(plugin_meta_fields(SLUG));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::FieldValue;

    #[test]
    fn test_posted_fields_are_renamed() {
        let posted: Attributes = [
            ("username", "jdoe"),
            ("email", " JDoe@Example.com"),
            ("custom-calc-field", "42"),
            ("vendor-telephone", " 555-0100 "),
            ("unmapped", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), FieldValue::text(v)))
        .collect();

        let mapped = posted_field_mapping().apply(&posted);
        assert_eq!(mapped.get("user_login"), Some(&FieldValue::text("jdoe")));
        assert_eq!(mapped.get("user_email"), Some(&FieldValue::text("jdoe@example.com")));
        assert_eq!(mapped.get("pseudo_field_key"), Some(&FieldValue::text("42")));
        assert_eq!(mapped.get("phone_number"), Some(&FieldValue::text("555-0100")));
        assert!(!mapped.contains_key("unmapped"));
    }

    #[test]
    fn test_custom_field_deserializes_type() {
        let field: CustomField =
            serde_json::from_str(r#"{"key": "company_size", "name": "Company size", "type": "int"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::Int);
    }
}
