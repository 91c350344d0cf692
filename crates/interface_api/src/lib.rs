//! HTTP API Layer
//!
//! This crate provides the REST API for the clinic tariff core using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: share calculation and health checks
//! - **Middleware**: request ids, tracing, audit logging
//! - **DTOs**: request/response data transfer objects in minor units
//! - **Error Handling**: consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(rules, config);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod locale;

use axum::{
    Router,
    http::HeaderName,
    routing::{get, post},
    middleware as axum_middleware,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use domain_tariff::rules::{BusinessRuleEngine, CachingRuleRepository, RuleRepository};
use domain_tariff::{InsuranceTariffOrchestrator, ShareCalculator};

use crate::config::ApiConfig;
use crate::handlers::{calculation, health};
use crate::middleware::{audit_middleware, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InsuranceTariffOrchestrator>,
    pub rules: Arc<dyn RuleRepository>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the orchestrator over a rule store according to the configuration
    ///
    /// The store is wrapped in a TTL cache when `rule_cache_ttl_secs` is set.
    pub fn new(rules: Arc<dyn RuleRepository>, config: ApiConfig) -> Self {
        let rules: Arc<dyn RuleRepository> = match config.rule_cache_ttl() {
            Some(ttl) => Arc::new(CachingRuleRepository::new(rules, ttl)),
            None => rules,
        };

        let mut engine = BusinessRuleEngine::new(rules.clone());
        if let Some(timeout) = config.rule_fetch_timeout() {
            engine = engine.with_fetch_timeout(timeout);
        }

        let orchestrator =
            InsuranceTariffOrchestrator::new(engine, ShareCalculator::new(config.rounding_policy()))
                .with_locale(config.locale);

        info!(
            currency = %config.currency,
            locale = config.locale.tag(),
            cache_ttl_secs = config.rule_cache_ttl_secs,
            fetch_timeout_ms = config.rule_fetch_timeout_ms,
            "Tariff orchestrator ready"
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            rules,
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Public routes
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let api_routes = Router::new()
        .route("/calculate-share", post(calculation::calculate_share))
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
