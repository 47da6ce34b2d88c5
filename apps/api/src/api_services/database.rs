use flowgate_core::AppError;
use flowgate_domain::ProviderAdapter;
use flowgate_infrastructure::PostgresProviderEndpointResolver;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::api_config::SeededEndpoint;

pub async fn connect_and_migrate(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

/// Upserts the configured webhook endpoints into `tenant_provider_endpoints`.
pub async fn provision_webhook_endpoints(
    pool: &PgPool,
    endpoints: &[SeededEndpoint],
) -> Result<(), AppError> {
    let resolver = PostgresProviderEndpointResolver::new(pool.clone());
    let provider = ProviderAdapter::webhook_workflow();

    for seeded in endpoints {
        resolver
            .upsert_endpoint(seeded.tenant_id, &provider, &seeded.endpoint)
            .await?;
        info!(
            tenant_id = %seeded.tenant_id,
            url = %seeded.endpoint.url,
            "webhook endpoint provisioned"
        );
    }

    Ok(())
}
