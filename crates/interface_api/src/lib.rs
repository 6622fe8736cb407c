//! HTTP API Layer
//!
//! This crate exposes the CRM sync core over HTTP using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: event intake, integration catalog and batch operations
//! - **Middleware**: JWT authentication for batch routes, audit logging
//! - **DTOs**: Response bodies
//! - **Error Handling**: Sync errors mapped to status codes with JSON bodies
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(registry, config, crm));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_integrations::IntegrationRegistry;
use domain_sync::CrmContactPort;

use crate::config::ApiConfig;
use crate::handlers::{batch, catalog, events, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<IntegrationRegistry>,
    pub config: ApiConfig,
    /// CRM adapter, probed by the health check
    pub crm: Arc<dyn CrmContactPort>,
}

impl AppState {
    pub fn new(registry: IntegrationRegistry, config: ApiConfig, crm: Arc<dyn CrmContactPort>) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            crm,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health::health_check));

    let catalog_routes = Router::new()
        .route("/events", post(events::receive_event))
        .route("/settings", get(catalog::list_settings))
        .route("/fields", get(catalog::list_fields))
        .route("/exports", get(catalog::list_exports));

    let batch_routes = Router::new()
        .route("/:slug/init", post(batch::batch_init))
        .route("/:slug/step/:id", post(batch::batch_step))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .merge(catalog_routes)
        .nest("/batch", batch_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
