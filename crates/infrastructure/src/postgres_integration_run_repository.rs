use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_application::{
    CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun, IntegrationRunListQuery,
    IntegrationRunRepository, RunTransitionOutcome, RunUpdate,
};
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{IntegrationRunStatus, ProviderAdapter};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

const RUN_COLUMNS: &str = r#"
    id,
    tenant_id,
    provider,
    action_name,
    action_version,
    request_id,
    idempotency_key,
    status,
    http_status,
    attempts,
    started_at,
    finished_at,
    response_payload,
    error_message,
    external_run_id
"#;

/// PostgreSQL-backed integration run ledger.
#[derive(Clone)]
pub struct PostgresIntegrationRunRepository {
    pool: PgPool,
}

impl PostgresIntegrationRunRepository {
    /// Creates a run repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_reusable_run(
        transaction: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        idempotency_key: &str,
        reuse_finished_since: DateTime<Utc>,
    ) -> AppResult<Option<IntegrationRun>> {
        sqlx::query(
            r#"
            SELECT pg_advisory_xact_lock(hashtextextended($1, 0))
            "#,
        )
        .bind(format!("integration_runs:{tenant_id}:{idempotency_key}"))
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock idempotency key for tenant '{tenant_id}': {error}"
            ))
        })?;

        let row = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            SELECT {RUN_COLUMNS}
            FROM integration_runs
            WHERE tenant_id = $1
              AND idempotency_key = $2
              AND (finished_at IS NULL OR finished_at >= $3)
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(idempotency_key)
        .bind(reuse_finished_since)
        .fetch_optional(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to look up idempotent run for tenant '{tenant_id}': {error}"
            ))
        })?;

        row.map(integration_run_from_row).transpose()
    }
}

#[derive(Debug, FromRow)]
struct IntegrationRunRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    provider: String,
    action_name: String,
    action_version: i32,
    request_id: String,
    idempotency_key: Option<String>,
    status: String,
    http_status: Option<i32>,
    attempts: i32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    response_payload: Option<Value>,
    error_message: Option<String>,
    external_run_id: Option<String>,
}

fn integration_run_from_row(row: IntegrationRunRow) -> AppResult<IntegrationRun> {
    Ok(IntegrationRun {
        run_id: row.id.to_string(),
        tenant_id: TenantId::from_uuid(row.tenant_id),
        provider: ProviderAdapter::new(row.provider)?,
        action_name: row.action_name,
        action_version: u32::try_from(row.action_version).map_err(|error| {
            AppError::Internal(format!("invalid stored action version: {error}"))
        })?,
        request_id: row.request_id,
        idempotency_key: row.idempotency_key,
        status: IntegrationRunStatus::parse(row.status.as_str())?,
        http_status: row
            .http_status
            .map(u16::try_from)
            .transpose()
            .map_err(|error| AppError::Internal(format!("invalid stored http status: {error}")))?,
        attempts: u32::try_from(row.attempts).map_err(|error| {
            AppError::Internal(format!("invalid stored attempt count: {error}"))
        })?,
        started_at: row.started_at,
        finished_at: row.finished_at,
        response_payload: row.response_payload,
        error_message: row.error_message,
        external_run_id: row.external_run_id,
    })
}

fn parse_run_id(run_id: &str) -> Option<uuid::Uuid> {
    uuid::Uuid::parse_str(run_id).ok()
}

fn page_bound(value: usize, name: &str) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|error| AppError::Validation(format!("invalid integration run {name}: {error}")))
}

#[async_trait]
impl IntegrationRunRepository for PostgresIntegrationRunRepository {
    async fn create_run(
        &self,
        tenant_id: TenantId,
        input: CreateIntegrationRunInput,
    ) -> AppResult<CreateRunOutcome> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin run creation transaction: {error}"))
        })?;

        if let Some(idempotency_key) = input.idempotency_key.as_deref() {
            let existing = Self::find_reusable_run(
                &mut transaction,
                tenant_id,
                idempotency_key,
                input.reuse_finished_since,
            )
            .await?;

            if let Some(existing) = existing {
                transaction.commit().await.map_err(|error| {
                    AppError::Internal(format!("failed to commit idempotent lookup: {error}"))
                })?;
                return Ok(CreateRunOutcome::Existing(existing));
            }
        }

        let action_version = i32::try_from(input.action_version).map_err(|error| {
            AppError::Validation(format!("invalid action version: {error}"))
        })?;

        let row = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            INSERT INTO integration_runs (
                tenant_id,
                provider,
                action_name,
                action_version,
                request_id,
                idempotency_key,
                status,
                attempts,
                started_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'started', 0, now())
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(input.provider.as_str())
        .bind(input.action_name.as_str())
        .bind(action_version)
        .bind(input.request_id.as_str())
        .bind(input.idempotency_key.as_deref())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to create integration run for tenant '{tenant_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit integration run: {error}"))
        })?;

        integration_run_from_row(row).map(CreateRunOutcome::Created)
    }

    async fn apply_update(
        &self,
        tenant_id: TenantId,
        run_id: &str,
        update: RunUpdate,
    ) -> AppResult<RunTransitionOutcome> {
        let not_found = || AppError::NotFound(format!("integration run '{run_id}' not found"));
        let run_uuid = parse_run_id(run_id).ok_or_else(not_found)?;

        let target = update.transition.target_status();
        let source_statuses: Vec<String> = update
            .transition
            .source_statuses()
            .iter()
            .map(|status| status.as_str().to_owned())
            .collect();
        let http_status = update.http_status.map(i32::from);
        let attempts = update
            .attempts
            .map(i32::try_from)
            .transpose()
            .map_err(|error| AppError::Validation(format!("invalid attempt count: {error}")))?;

        let row = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            UPDATE integration_runs
            SET
                status = $3,
                http_status = COALESCE($4, http_status),
                attempts = COALESCE($5, attempts),
                response_payload = COALESCE($6, response_payload),
                error_message = COALESCE($7, error_message),
                external_run_id = COALESCE($8, external_run_id),
                finished_at = CASE WHEN $9 THEN now() ELSE finished_at END
            WHERE tenant_id = $1
              AND id = $2
              AND status = ANY($10)
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(run_uuid)
        .bind(target.as_str())
        .bind(http_status)
        .bind(attempts)
        .bind(update.response_payload)
        .bind(update.error_message)
        .bind(update.external_run_id)
        .bind(target.is_terminal())
        .bind(source_statuses)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update integration run '{run_id}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        if let Some(row) = row {
            return integration_run_from_row(row).map(RunTransitionOutcome::Applied);
        }

        self.find_run(Some(tenant_id), run_id)
            .await?
            .map(RunTransitionOutcome::Rejected)
            .ok_or_else(not_found)
    }

    async fn find_run(
        &self,
        tenant_scope: Option<TenantId>,
        run_id: &str,
    ) -> AppResult<Option<IntegrationRun>> {
        let Some(run_uuid) = parse_run_id(run_id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            SELECT {RUN_COLUMNS}
            FROM integration_runs
            WHERE id = $1
              AND ($2::UUID IS NULL OR tenant_id = $2)
            "#
        ))
        .bind(run_uuid)
        .bind(tenant_scope.map(|tenant_id| tenant_id.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find integration run '{run_id}': {error}"))
        })?;

        row.map(integration_run_from_row).transpose()
    }

    async fn find_runs_by_request_id(
        &self,
        tenant_scope: Option<TenantId>,
        request_id: &str,
    ) -> AppResult<Vec<IntegrationRun>> {
        let rows = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            SELECT {RUN_COLUMNS}
            FROM integration_runs
            WHERE request_id = $1
              AND ($2::UUID IS NULL OR tenant_id = $2)
            ORDER BY started_at DESC, id DESC
            "#
        ))
        .bind(request_id)
        .bind(tenant_scope.map(|tenant_id| tenant_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find integration runs for request '{request_id}': {error}"
            ))
        })?;

        rows.into_iter().map(integration_run_from_row).collect()
    }

    async fn list_runs(
        &self,
        tenant_id: TenantId,
        query: IntegrationRunListQuery,
    ) -> AppResult<Vec<IntegrationRun>> {
        let rows = sqlx::query_as::<_, IntegrationRunRow>(&format!(
            r#"
            SELECT {RUN_COLUMNS}
            FROM integration_runs
            WHERE tenant_id = $1
              AND ($2::TEXT IS NULL OR action_name = $2)
              AND ($3::TEXT IS NULL OR status = $3)
            ORDER BY started_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(query.action_name)
        .bind(query.status.map(|status| status.as_str()))
        .bind(page_bound(query.limit, "list limit")?)
        .bind(page_bound(query.offset, "list offset")?)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list integration runs for tenant '{tenant_id}': {error}"
            ))
        })?;

        rows.into_iter().map(integration_run_from_row).collect()
    }
}
