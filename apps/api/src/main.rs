//! Flowgate API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::time::Duration;

use flowgate_application::RateLimitService;
use flowgate_core::AppError;
use tracing::{error, info};

use crate::api_config::{ApiConfig, StorageBackend, init_tracing};
use crate::api_services::{
    build_app_state, build_provider_registry, build_storage_adapters, connect_and_migrate,
    provision_webhook_endpoints,
};

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = match config.database_url.as_deref() {
        Some(database_url) => Some(connect_and_migrate(database_url).await?),
        None => None,
    };

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    if let (StorageBackend::Postgres, Some(pool)) = (config.storage_backend, pool.as_ref()) {
        provision_webhook_endpoints(pool, &config.webhook_endpoints).await?;
    }

    let adapters = build_storage_adapters(pool, &config)?;
    let providers = build_provider_registry(&config)?;
    let app_state = build_app_state(adapters, providers, &config);

    spawn_rate_limit_cleanup(app_state.rate_limit_service.clone());

    let app = api_router::build_router(app_state);
    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind API listener: {error}")))?;

    info!(
        %address,
        storage = ?config.storage_backend,
        rate_limit_store = ?config.rate_limit_store,
        limit_per_minute = config.rate_limit_policy.limit_per_minute,
        "flowgate api listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("API server failed: {error}")))
}

fn spawn_rate_limit_cleanup(rate_limit_service: RateLimitService) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(RATE_LIMIT_CLEANUP_INTERVAL).await;

            match rate_limit_service.cleanup().await {
                Ok(removed) if removed > 0 => info!(removed, "expired rate limit windows removed"),
                Ok(_) => {}
                Err(error) => error!(error = %error, "rate limit cleanup failed"),
            }
        }
    });
}
