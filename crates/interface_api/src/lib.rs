//! HTTP API Layer
//!
//! REST surface of the clinic billing ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: invoice creation, listing, detail, payments, statistics
//! - **Middleware**: bearer-token authentication resolving an `Actor`, audit logging
//! - **DTOs**: validated request bodies and query strings
//! - **Error Handling**: `BillingError` kinds mapped onto HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(Arc::new(service), config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_billing::{BillingService, RetryPolicy};

use crate::config::ApiConfig;
use crate::handlers::{billing, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BillingService>,
    pub config: ApiConfig,
    /// Applied to payment requests that lose a concurrent update race
    pub retry: RetryPolicy,
}

/// Creates the main API router
pub fn create_router(service: Arc<BillingService>, config: ApiConfig) -> Router {
    let state = AppState {
        service,
        config,
        retry: RetryPolicy::default(),
    };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/", post(billing::create_invoice).get(billing::list_invoices))
        .route("/:id", get(billing::get_invoice))
        .route("/:id/payments", post(billing::apply_payment));

    // Protected API routes; audit wraps auth so rejected requests are logged too
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .route("/billing/statistics", get(billing::statistics))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(audit_middleware))
                .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

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
