//! Clinic Tariff Core - API Server Binary
//!
//! This binary starts the HTTP API server for share calculations.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration (no rules)
//! cargo run --bin tariff-api
//!
//! # Rules from PostgreSQL
//! API_DATABASE_URL=postgres://... API_RULE_CACHE_TTL_SECS=60 cargo run --bin tariff-api
//!
//! # Rules from a JSON document
//! API_RULES_FILE=rules.json API_LOCALE=en-US cargo run --bin tariff-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_DATABASE_URL` - PostgreSQL connection string for the rule store
//! * `API_RUN_MIGRATIONS` - Apply bundled migrations on startup (default: false)
//! * `API_RULES_FILE` - JSON rule document, used when no database is set
//! * `API_LOCALE` - Default message locale, fa-IR or en-US (default: fa-IR)
//! * `API_CURRENCY` - Default currency (default: IRR)
//! * `API_ROUNDING_DECIMALS` - Currency decimal places (default: the currency's)
//! * `API_ROUNDING_MODE` - half_away_from_zero, half_even, toward_zero, away_from_zero
//! * `API_RULE_CACHE_TTL_SECS` - Rule cache lifetime, 0 disables (default: 0)
//! * `API_RULE_FETCH_TIMEOUT_MS` - Rule fetch timeout, 0 disables (default: 2000)
//! * `API_TIMEZONE` - Clinic timezone (default: Asia/Tehran)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_tariff::rules::{InMemoryRuleRepository, RuleRepository};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresRuleRepository};
use interface_api::{config::ApiConfig, create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, opens the rule store and starts
/// the HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = config.timezone.name(),
        "Starting Clinic Tariff API Server"
    );

    let rules = open_rule_store(&config).await?;
    let app = create_router(AppState::new(rules, config.clone()));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
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

/// Opens the configured rule store.
///
/// PostgreSQL wins over a rule file; with neither, the server runs with no
/// rules and every calculation uses the plan's own parameters.
async fn open_rule_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn RuleRepository>> {
    if let Some(url) = &config.database_url {
        tracing::info!("Connecting to rule database...");
        let pool = create_pool(DatabaseConfig::new(url.as_str()))
            .await
            .context("cannot connect to the rule database")?;

        if config.run_migrations {
            run_migrations(&pool).await.context("migrations failed")?;
        }

        return Ok(Arc::new(PostgresRuleRepository::new(pool)));
    }

    if let Some(path) = &config.rules_file {
        let repository = InMemoryRuleRepository::from_path(path)
            .await
            .with_context(|| format!("cannot load rules from {}", path))?;
        return Ok(Arc::new(repository));
    }

    tracing::warn!("No rule store configured, calculating with plan parameters only");
    Ok(Arc::new(InMemoryRuleRepository::default()))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a signal handler cannot be installed, that branch never completes
/// and the other still triggers shutdown.
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
