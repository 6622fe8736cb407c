//! In-memory Sync Harness
//!
//! Wires the mock collaborators from `domain_sync` into engines and a fully
//! populated integration registry, so scenario tests only describe the data
//! they care about.

use std::sync::Arc;

use domain_integrations::{
    EcommerceIntegration, FeedSettings, FormEntry, FormsIntegration, InMemoryFeedSettings,
    IntegrationRegistry, MembershipIntegration, Order,
};
use domain_sync::{
    AccountLinkPort, ConfigProvider, ContactSyncEngine, MockAccountLinks, MockCrm, MockEntityStore, MockTagConfig,
    StaticConfigProvider, SyncConfig,
};

use core_kernel::{AccountId, ContactId, FeedId, ItemId, TagId};

use crate::fixtures::{IdFixtures, StringFixtures, TagFixtures};

/// Mock collaborators shared by every engine built from the harness
pub struct SyncHarness {
    pub crm: Arc<MockCrm>,
    pub accounts: Arc<MockAccountLinks>,
    pub tag_config: Arc<MockTagConfig>,
    pub orders: Arc<MockEntityStore<Order>>,
    pub entries: Arc<MockEntityStore<FormEntry>>,
    pub feeds: Arc<InMemoryFeedSettings>,
}

impl Default for SyncHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncHarness {
    pub fn new() -> Self {
        Self {
            crm: Arc::new(MockCrm::with_name(StringFixtures::crm_name())),
            accounts: Arc::new(MockAccountLinks::new()),
            tag_config: Arc::new(MockTagConfig::new()),
            orders: Arc::new(MockEntityStore::new()),
            entries: Arc::new(MockEntityStore::new()),
            feeds: Arc::new(InMemoryFeedSettings::new()),
        }
    }

    /// Harness with the standard product tags (A: T1, T2 and B: T2)
    pub async fn with_product_tags() -> Self {
        let harness = Self::new();
        harness.tag_products(IdFixtures::product_a(), TagFixtures::product_a_tags()).await;
        harness.tag_products(IdFixtures::product_b(), TagFixtures::product_b_tags()).await;
        harness
    }

    pub async fn tag_products(&self, item_id: ItemId, tags: Vec<TagId>) {
        self.tag_config.set(item_id, tags).await;
    }

    pub async fn add_feed(&self, feed_id: FeedId, settings: FeedSettings) {
        self.feeds.insert(feed_id, settings).await;
    }

    /// Links an account to an existing CRM contact
    pub async fn link_account(&self, account_id: AccountId, contact_id: &ContactId) {
        self.accounts
            .link_contact(account_id, contact_id)
            .await
            .expect("mock account links never fail");
    }

    pub fn order_engine(&self) -> ContactSyncEngine<Order> {
        ContactSyncEngine::new(
            self.crm.clone(),
            self.accounts.clone(),
            self.tag_config.clone(),
            self.orders.clone(),
        )
    }

    pub fn form_engine(&self) -> ContactSyncEngine<FormEntry> {
        ContactSyncEngine::new(
            self.crm.clone(),
            self.accounts.clone(),
            self.tag_config.clone(),
            self.entries.clone(),
        )
    }

    /// Site configuration with T3 as the global purchase tag
    pub fn config(&self) -> StaticConfigProvider {
        StaticConfigProvider::new().with_integration(
            domain_integrations::ecommerce::SLUG,
            SyncConfig::default().with_tags(TagFixtures::global()),
        )
    }

    /// Registry with all three integrations enabled
    pub fn registry(&self, config: Arc<dyn ConfigProvider>) -> IntegrationRegistry {
        IntegrationRegistry::new()
            .register(Arc::new(EcommerceIntegration::new(self.order_engine(), config.clone())))
            .register(Arc::new(FormsIntegration::new(
                self.form_engine(),
                self.feeds.clone(),
                config.clone(),
            )))
            .register(Arc::new(MembershipIntegration::new(
                self.crm.clone(),
                self.accounts.clone(),
                config,
            )))
    }
}
