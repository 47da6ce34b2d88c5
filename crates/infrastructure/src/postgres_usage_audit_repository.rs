use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_application::{
    UsageAuditEntry, UsageAuditQuery, UsageAuditReader, UsageAuditSink, UsageAuditStatus,
};
use flowgate_core::{AppError, AppResult, TenantId};
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed usage audit log over `integration_usage_log`.
#[derive(Clone)]
pub struct PostgresUsageAuditRepository {
    pool: PgPool,
}

impl PostgresUsageAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UsageAuditRow {
    tenant_id: uuid::Uuid,
    action_name: String,
    run_id: Option<String>,
    status: String,
    duration_ms: i64,
    error_message: Option<String>,
    request_id: String,
    created_at: DateTime<Utc>,
}

fn usage_entry_from_row(row: UsageAuditRow) -> AppResult<UsageAuditEntry> {
    Ok(UsageAuditEntry {
        tenant_id: TenantId::from_uuid(row.tenant_id),
        action_name: row.action_name,
        run_id: row.run_id,
        status: UsageAuditStatus::parse(row.status.as_str())?,
        duration_ms: u64::try_from(row.duration_ms).map_err(|error| {
            AppError::Internal(format!("invalid stored usage duration: {error}"))
        })?,
        error_message: row.error_message,
        request_id: row.request_id,
        created_at: row.created_at,
    })
}

#[async_trait]
impl UsageAuditSink for PostgresUsageAuditRepository {
    async fn append_entry(&self, entry: UsageAuditEntry) -> AppResult<()> {
        let duration_ms = i64::try_from(entry.duration_ms).unwrap_or(i64::MAX);

        sqlx::query(
            r#"
            INSERT INTO integration_usage_log (
                tenant_id,
                action_name,
                run_id,
                status,
                duration_ms,
                error_message,
                request_id,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.action_name.as_str())
        .bind(entry.run_id.as_deref())
        .bind(entry.status.as_str())
        .bind(duration_ms)
        .bind(entry.error_message.as_deref())
        .bind(entry.request_id.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to append usage audit entry for tenant '{}': {error}",
                entry.tenant_id
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl UsageAuditReader for PostgresUsageAuditRepository {
    async fn list_entries(
        &self,
        tenant_id: TenantId,
        query: UsageAuditQuery,
    ) -> AppResult<Vec<UsageAuditEntry>> {
        let limit = i64::try_from(query.limit)
            .map_err(|error| AppError::Validation(format!("invalid usage limit: {error}")))?;
        let offset = i64::try_from(query.offset)
            .map_err(|error| AppError::Validation(format!("invalid usage offset: {error}")))?;

        let rows = sqlx::query_as::<_, UsageAuditRow>(
            r#"
            SELECT
                tenant_id,
                action_name,
                run_id,
                status,
                duration_ms,
                error_message,
                request_id,
                created_at
            FROM integration_usage_log
            WHERE tenant_id = $1
              AND ($2::TEXT IS NULL OR action_name = $2)
              AND ($3::TEXT IS NULL OR status = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(query.action_name)
        .bind(query.status.map(|status| status.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list usage audit entries for tenant '{tenant_id}': {error}"
            ))
        })?;

        rows.into_iter().map(usage_entry_from_row).collect()
    }
}
