use async_trait::async_trait;
use flowgate_application::{ProviderEndpoint, ProviderEndpointResolver};
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::ProviderAdapter;
use sqlx::{FromRow, PgPool};
use url::Url;

/// Resolves tenant provider endpoints from `tenant_provider_endpoints`.
#[derive(Clone)]
pub struct PostgresProviderEndpointResolver {
    pool: PgPool,
}

impl PostgresProviderEndpointResolver {
    /// Creates a resolver with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the endpoint for one tenant and adapter.
    pub async fn upsert_endpoint(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        endpoint: &ProviderEndpoint,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_provider_endpoints (tenant_id, provider, endpoint_url, bearer_token, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (tenant_id, provider) DO UPDATE
            SET
                endpoint_url = EXCLUDED.endpoint_url,
                bearer_token = EXCLUDED.bearer_token,
                updated_at = now()
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(provider.as_str())
        .bind(endpoint.url.as_str())
        .bind(endpoint.bearer_token.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save provider endpoint '{provider}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct EndpointRow {
    endpoint_url: String,
    bearer_token: Option<String>,
}

#[async_trait]
impl ProviderEndpointResolver for PostgresProviderEndpointResolver {
    async fn resolve_endpoint(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
    ) -> AppResult<Option<ProviderEndpoint>> {
        let row = sqlx::query_as::<_, EndpointRow>(
            r#"
            SELECT endpoint_url, bearer_token
            FROM tenant_provider_endpoints
            WHERE tenant_id = $1 AND provider = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to resolve provider endpoint '{provider}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        row.map(|row| {
            let url = Url::parse(row.endpoint_url.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "invalid stored endpoint url for provider '{provider}': {error}"
                ))
            })?;
            Ok(ProviderEndpoint {
                url,
                bearer_token: row.bearer_token,
            })
        })
        .transpose()
    }
}
