use std::sync::Arc;

use flowgate_core::{AppError, AppResult, CallerIdentity, TenantId};
use flowgate_domain::ActionDefinition;
use serde_json::Value;
use tracing::info;

use crate::integration_ports::ActionDefinitionRepository;

/// Lookup and validation of tenant action definitions.
///
/// Disabled and missing definitions both resolve as `NotFound`, so callers cannot tell an
/// action that was switched off from one that never existed.
#[derive(Clone)]
pub struct ActionRegistry {
    repository: Arc<dyn ActionDefinitionRepository>,
    admin_role: String,
}

impl ActionRegistry {
    /// Creates a registry; `admin_role` guards definition writes.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ActionDefinitionRepository>,
        admin_role: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            admin_role: admin_role.into(),
        }
    }

    /// Resolves an enabled definition, using the latest enabled version when none is given.
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
        version: Option<u32>,
    ) -> AppResult<ActionDefinition> {
        let definition = match version {
            Some(version) => self
                .repository
                .find_definition(tenant_id, app_key, action_key, version)
                .await?
                .filter(ActionDefinition::is_enabled),
            None => {
                self.repository
                    .find_latest_enabled_definition(tenant_id, app_key, action_key)
                    .await?
            }
        };

        definition.ok_or_else(|| {
            let version =
                version.map_or_else(|| "latest".to_owned(), |value| format!("v{value}"));
            AppError::NotFound(format!(
                "action '{app_key}.{action_key}' ({version}) does not exist for tenant '{tenant_id}'"
            ))
        })
    }

    /// Checks the payload against the definition's required fields.
    pub fn validate(&self, definition: &ActionDefinition, payload: &Value) -> AppResult<()> {
        definition.validate_payload(payload)
    }

    /// Saves a definition for the caller's tenant.
    pub async fn save_definition(
        &self,
        caller: &CallerIdentity,
        definition: ActionDefinition,
    ) -> AppResult<ActionDefinition> {
        self.require_admin(caller)?;

        let stored = self
            .repository
            .save_definition(caller.tenant_id(), definition)
            .await?;

        info!(
            tenant_id = %caller.tenant_id(),
            action = %stored.qualified_name(),
            version = stored.version(),
            enabled = stored.is_enabled(),
            "action definition saved"
        );

        Ok(stored)
    }

    /// Lists every definition of the caller's tenant, including disabled ones.
    pub async fn list_definitions(
        &self,
        caller: &CallerIdentity,
    ) -> AppResult<Vec<ActionDefinition>> {
        self.require_admin(caller)?;
        self.repository.list_definitions(caller.tenant_id()).await
    }

    fn require_admin(&self, caller: &CallerIdentity) -> AppResult<()> {
        if caller.has_role(self.admin_role.as_str()) {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "role '{}' is required to manage action definitions",
            self.admin_role
        )))
    }
}
