//! API configuration

use serde::Deserialize;
use validator::Validate;

use core_kernel::TagId;
use domain_sync::{StaticConfigProvider, SyncConfig, DEFAULT_LOOKUP_FIELD};

fn tag_list(list: &str) -> Vec<TagId> {
    list.split(',').map(|tag| TagId::new(tag.trim())).collect()
}

/// API configuration
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    #[validate(range(min = 1))]
    pub port: u16,
    /// JWT secret for the batch routes
    #[validate(length(min = 16, message = "JWT secret must be at least 16 characters"))]
    pub jwt_secret: String,
    /// JWT expiration in seconds
    #[validate(range(min = 60))]
    pub jwt_expiration_secs: u64,
    /// Log level
    pub log_level: String,
    /// CRM display name used in settings text and audit notes
    #[validate(length(min = 1))]
    pub crm_name: String,
    /// CRM field used to find existing contacts
    #[validate(length(min = 1))]
    pub lookup_field: String,
    /// Comma-separated tags applied to every purchasing customer
    pub purchase_tags: String,
    /// Comma-separated tags applied to newly registered members
    pub registration_tags: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            log_level: "info".to_string(),
            crm_name: "CRM".to_string(),
            lookup_field: DEFAULT_LOOKUP_FIELD.to_string(),
            purchase_tags: String::new(),
            registration_tags: String::new(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_`-prefixed environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config: ApiConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()?;

        config
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }

    /// Per-integration sync settings
    pub fn sync_settings(&self) -> StaticConfigProvider {
        let base = || SyncConfig::default().with_lookup_field(self.lookup_field.clone());
        StaticConfigProvider::new()
            .with_lookup_field(self.lookup_field.clone())
            .with_integration(
                domain_integrations::ecommerce::SLUG,
                base().with_tags(tag_list(&self.purchase_tags)),
            )
            .with_integration(
                domain_integrations::membership::SLUG,
                base().with_tags(tag_list(&self.registration_tags)),
            )
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
