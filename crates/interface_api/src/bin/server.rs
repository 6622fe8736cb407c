//! CRM Sync API - Server Binary
//!
//! Starts the HTTP API in front of the integration registry. The binary
//! wires in-memory development backends for the CRM, account links, tag
//! settings and plugin stores.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin fusion-sync-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_CRM_NAME=ActiveCampaign API_PURCHASE_TAGS=customer cargo run --bin fusion-sync-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret for the batch routes
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_CRM_NAME` - CRM display name (default: CRM)
//! * `API_LOOKUP_FIELD` - CRM field used to find contacts (default: email)
//! * `API_PURCHASE_TAGS` / `API_REGISTRATION_TAGS` - comma-separated tag ids

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_integrations::{
    EcommerceIntegration, FormEntry, FormsIntegration, InMemoryFeedSettings, IntegrationRegistry,
    MembershipIntegration, Order,
};
use domain_sync::{
    ConfigProvider, ContactSyncEngine, MockAccountLinks, MockCrm, MockEntityStore, MockTagConfig,
};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("Invalid API configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        crm = %config.crm_name,
        "Starting CRM sync API server"
    );

    let crm = Arc::new(MockCrm::with_name(config.crm_name.clone()));
    let registry = dev_registry(crm.clone(), Arc::new(config.sync_settings()));
    // The in-memory order store and feed settings start empty and no route
    // fills them, so order and form events fail with not-found / unknown feed
    // until a platform adapter is wired in. Membership events work as-is.
    tracing::warn!(
        "Using in-memory development backends; order and form events need a platform adapter"
    );

    let app = create_router(AppState::new(registry, config.clone(), crm));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Builds the registry over empty in-memory collaborators
fn dev_registry(crm: Arc<MockCrm>, config: Arc<dyn ConfigProvider>) -> IntegrationRegistry {
    let accounts = Arc::new(MockAccountLinks::new());
    let tag_config = Arc::new(MockTagConfig::new());

    let orders = ContactSyncEngine::new(
        crm.clone(),
        accounts.clone(),
        tag_config.clone(),
        Arc::new(MockEntityStore::<Order>::new()),
    );
    let entries = ContactSyncEngine::new(
        crm.clone(),
        accounts.clone(),
        tag_config,
        Arc::new(MockEntityStore::<FormEntry>::new()),
    );

    IntegrationRegistry::new()
        .register(Arc::new(EcommerceIntegration::new(orders, config.clone())))
        .register(Arc::new(FormsIntegration::new(
            entries,
            Arc::new(InMemoryFeedSettings::new()),
            config.clone(),
        )))
        .register(Arc::new(MembershipIntegration::new(crm, accounts, config)))
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
