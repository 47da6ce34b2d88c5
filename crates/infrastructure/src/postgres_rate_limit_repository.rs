//! PostgreSQL-backed rate limit repository using the `integration_rate_limits` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use flowgate_application::RateLimitRepository;
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{ProviderAdapter, RateLimitDecision, RateLimitWindow};

/// PostgreSQL implementation of the rate limit repository port.
#[derive(Clone)]
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn try_admit(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        limit_per_minute: u32,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        if limit_per_minute == 0 {
            return Ok(RateLimitDecision::Limited {
                retry_after_seconds: RateLimitWindow::retry_after_seconds(now),
            });
        }

        let limit = i32::try_from(limit_per_minute).map_err(|error| {
            AppError::Validation(format!("invalid rate limit ceiling: {error}"))
        })?;
        let window_start = RateLimitWindow::minute_start(now);

        // Only a newer minute resets the counter. A caller whose clock lags behind the stored
        // window is counted against that window. A full window returns no row.
        let row = sqlx::query_as::<_, WindowRow>(
            r#"
            INSERT INTO integration_rate_limits (tenant_id, provider, window_start, requests_in_window)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (tenant_id, provider) DO UPDATE
            SET
                requests_in_window = CASE
                    WHEN EXCLUDED.window_start > integration_rate_limits.window_start
                    THEN 1
                    ELSE integration_rate_limits.requests_in_window + 1
                END,
                window_start = GREATEST(
                    integration_rate_limits.window_start,
                    EXCLUDED.window_start
                )
            WHERE EXCLUDED.window_start > integration_rate_limits.window_start
               OR integration_rate_limits.requests_in_window < $4
            RETURNING requests_in_window
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(provider.as_str())
        .bind(window_start)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to admit dispatch for tenant '{tenant_id}' provider '{provider}': {error}"
            ))
        })?;

        let Some(row) = row else {
            return Ok(RateLimitDecision::Limited {
                retry_after_seconds: RateLimitWindow::retry_after_seconds(now),
            });
        };

        let used = u32::try_from(row.requests_in_window).map_err(|error| {
            AppError::Internal(format!("invalid stored rate limit counter: {error}"))
        })?;

        Ok(RateLimitDecision::Allowed {
            remaining: limit_per_minute.saturating_sub(used),
        })
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM integration_rate_limits
            WHERE window_start < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to cleanup expired rate limits: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WindowRow {
    requests_in_window: i32,
}
