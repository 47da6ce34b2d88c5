use async_trait::async_trait;
use flowgate_core::{AppResult, TenantId};
use flowgate_domain::ActionDefinition;

/// Repository port for tenant action definitions.
#[async_trait]
pub trait ActionDefinitionRepository: Send + Sync {
    /// Inserts or replaces one definition keyed by `(tenant, app_key, action_key, version)`.
    ///
    /// Replacing an existing version keeps its original `created_at`. Returns the stored
    /// definition.
    async fn save_definition(
        &self,
        tenant_id: TenantId,
        definition: ActionDefinition,
    ) -> AppResult<ActionDefinition>;

    /// Returns one exact definition version, enabled or not.
    async fn find_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
        version: u32,
    ) -> AppResult<Option<ActionDefinition>>;

    /// Returns the most recently created enabled definition for the action.
    async fn find_latest_enabled_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ActionDefinition>>;

    /// Lists all definitions for a tenant ordered by qualified name and version.
    async fn list_definitions(&self, tenant_id: TenantId) -> AppResult<Vec<ActionDefinition>>;
}
