use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_application::ActionDefinitionRepository;
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{ActionDefinition, ActionDefinitionInput, ActionInputSchema, ProviderAdapter};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

const DEFINITION_COLUMNS: &str = r#"
    app_key,
    action_key,
    version,
    display_name,
    provider,
    enabled,
    input_schema,
    output_schema,
    created_at
"#;

/// PostgreSQL-backed action definition repository.
#[derive(Clone)]
pub struct PostgresActionDefinitionRepository {
    pool: PgPool,
}

impl PostgresActionDefinitionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ActionDefinitionRow {
    app_key: String,
    action_key: String,
    version: i32,
    display_name: Option<String>,
    provider: String,
    enabled: bool,
    input_schema: Value,
    output_schema: Option<Value>,
    created_at: DateTime<Utc>,
}

fn action_definition_from_row(row: ActionDefinitionRow) -> AppResult<ActionDefinition> {
    ActionDefinition::new(ActionDefinitionInput {
        app_key: row.app_key,
        action_key: row.action_key,
        version: u32::try_from(row.version).map_err(|error| {
            AppError::Internal(format!("invalid stored action version: {error}"))
        })?,
        display_name: row.display_name,
        provider: ProviderAdapter::new(row.provider)?,
        enabled: row.enabled,
        input_schema: ActionInputSchema::from_json(row.input_schema)?,
        output_schema: row.output_schema,
        created_at: row.created_at,
    })
}

fn stored_version(version: u32) -> AppResult<i32> {
    i32::try_from(version)
        .map_err(|error| AppError::Validation(format!("invalid action version: {error}")))
}

#[async_trait]
impl ActionDefinitionRepository for PostgresActionDefinitionRepository {
    async fn save_definition(
        &self,
        tenant_id: TenantId,
        definition: ActionDefinition,
    ) -> AppResult<ActionDefinition> {
        let row = sqlx::query_as::<_, ActionDefinitionRow>(&format!(
            r#"
            INSERT INTO integration_action_definitions (
                tenant_id,
                app_key,
                action_key,
                version,
                display_name,
                provider,
                enabled,
                input_schema,
                output_schema,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (tenant_id, app_key, action_key, version) DO UPDATE
            SET
                display_name = EXCLUDED.display_name,
                provider = EXCLUDED.provider,
                enabled = EXCLUDED.enabled,
                input_schema = EXCLUDED.input_schema,
                output_schema = EXCLUDED.output_schema
            RETURNING {DEFINITION_COLUMNS}
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(definition.app_key().as_str())
        .bind(definition.action_key().as_str())
        .bind(stored_version(definition.version())?)
        .bind(definition.display_name())
        .bind(definition.provider().as_str())
        .bind(definition.is_enabled())
        .bind(definition.input_schema().to_json())
        .bind(definition.output_schema())
        .bind(definition.created_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save action definition '{}' for tenant '{tenant_id}': {error}",
                definition.qualified_name()
            ))
        })?;

        action_definition_from_row(row)
    }

    async fn find_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
        version: u32,
    ) -> AppResult<Option<ActionDefinition>> {
        let row = sqlx::query_as::<_, ActionDefinitionRow>(&format!(
            r#"
            SELECT {DEFINITION_COLUMNS}
            FROM integration_action_definitions
            WHERE tenant_id = $1 AND app_key = $2 AND action_key = $3 AND version = $4
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(app_key)
        .bind(action_key)
        .bind(stored_version(version)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find action '{app_key}.{action_key}' v{version} for tenant '{tenant_id}': {error}"
            ))
        })?;

        row.map(action_definition_from_row).transpose()
    }

    async fn find_latest_enabled_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ActionDefinition>> {
        let row = sqlx::query_as::<_, ActionDefinitionRow>(&format!(
            r#"
            SELECT {DEFINITION_COLUMNS}
            FROM integration_action_definitions
            WHERE tenant_id = $1 AND app_key = $2 AND action_key = $3 AND enabled
            ORDER BY created_at DESC, version DESC
            LIMIT 1
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(app_key)
        .bind(action_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find latest action '{app_key}.{action_key}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        row.map(action_definition_from_row).transpose()
    }

    async fn list_definitions(&self, tenant_id: TenantId) -> AppResult<Vec<ActionDefinition>> {
        let rows = sqlx::query_as::<_, ActionDefinitionRow>(&format!(
            r#"
            SELECT {DEFINITION_COLUMNS}
            FROM integration_action_definitions
            WHERE tenant_id = $1
            ORDER BY app_key, action_key, version
            "#
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list action definitions for tenant '{tenant_id}': {error}"
            ))
        })?;

        rows.into_iter().map(action_definition_from_row).collect()
    }
}
