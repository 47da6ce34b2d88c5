use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_application::{
    ActionDefinitionRepository, CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun,
    IntegrationRunListQuery, IntegrationRunRepository, ProviderEndpoint,
    ProviderEndpointResolver, RateLimitRepository, RunTransitionOutcome, RunUpdate,
    UsageAuditEntry, UsageAuditQuery, UsageAuditReader, UsageAuditSink,
};
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{
    ActionDefinition, IntegrationRunStatus, ProviderAdapter, RateLimitDecision, RateLimitWindow,
};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory action definition repository.
#[derive(Debug, Default)]
pub struct InMemoryActionDefinitionRepository {
    definitions: RwLock<HashMap<(TenantId, String, String, u32), ActionDefinition>>,
}

impl InMemoryActionDefinitionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionDefinitionRepository for InMemoryActionDefinitionRepository {
    async fn save_definition(
        &self,
        tenant_id: TenantId,
        definition: ActionDefinition,
    ) -> AppResult<ActionDefinition> {
        let key = (
            tenant_id,
            definition.app_key().as_str().to_owned(),
            definition.action_key().as_str().to_owned(),
            definition.version(),
        );
        let mut definitions = self.definitions.write().await;
        let stored = match definitions.get(&key) {
            Some(existing) => definition.with_created_at(existing.created_at()),
            None => definition,
        };
        definitions.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
        version: u32,
    ) -> AppResult<Option<ActionDefinition>> {
        let key = (tenant_id, app_key.to_owned(), action_key.to_owned(), version);
        Ok(self.definitions.read().await.get(&key).cloned())
    }

    async fn find_latest_enabled_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ActionDefinition>> {
        let definitions = self.definitions.read().await;
        Ok(definitions
            .iter()
            .filter(|((stored_tenant, stored_app, stored_action, _), definition)| {
                *stored_tenant == tenant_id
                    && stored_app == app_key
                    && stored_action == action_key
                    && definition.is_enabled()
            })
            .map(|(_, definition)| definition)
            .max_by_key(|definition| (definition.created_at(), definition.version()))
            .cloned())
    }

    async fn list_definitions(&self, tenant_id: TenantId) -> AppResult<Vec<ActionDefinition>> {
        let definitions = self.definitions.read().await;
        let mut values: Vec<ActionDefinition> = definitions
            .iter()
            .filter(|((stored_tenant, _, _, _), _)| *stored_tenant == tenant_id)
            .map(|(_, definition)| definition.clone())
            .collect();
        values.sort_by(|left, right| {
            (left.app_key().as_str(), left.action_key().as_str(), left.version()).cmp(&(
                right.app_key().as_str(),
                right.action_key().as_str(),
                right.version(),
            ))
        });
        Ok(values)
    }
}

/// In-memory run ledger.
///
/// One mutex guards all rows, so idempotent creation and status swaps are atomic.
#[derive(Debug, Default)]
pub struct InMemoryIntegrationRunRepository {
    runs: Mutex<Vec<IntegrationRun>>,
}

impl InMemoryIntegrationRunRepository {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sorts by `started_at` then run id, both descending.
fn newest_first(runs: &mut [IntegrationRun]) {
    runs.sort_by(|left, right| {
        (right.started_at, right.run_id.as_str()).cmp(&(left.started_at, left.run_id.as_str()))
    });
}

#[async_trait]
impl IntegrationRunRepository for InMemoryIntegrationRunRepository {
    async fn create_run(
        &self,
        tenant_id: TenantId,
        input: CreateIntegrationRunInput,
    ) -> AppResult<CreateRunOutcome> {
        let mut runs = self.runs.lock().await;

        if let Some(idempotency_key) = input.idempotency_key.as_deref() {
            let existing = runs
                .iter()
                .filter(|run| {
                    run.tenant_id == tenant_id
                        && run.idempotency_key.as_deref() == Some(idempotency_key)
                        && run
                            .finished_at
                            .is_none_or(|finished_at| finished_at >= input.reuse_finished_since)
                })
                .max_by(|left, right| {
                    (left.started_at, left.run_id.as_str())
                        .cmp(&(right.started_at, right.run_id.as_str()))
                });

            if let Some(existing) = existing {
                return Ok(CreateRunOutcome::Existing(existing.clone()));
            }
        }

        let run = IntegrationRun {
            run_id: Uuid::new_v4().to_string(),
            tenant_id,
            provider: input.provider,
            action_name: input.action_name,
            action_version: input.action_version,
            request_id: input.request_id,
            idempotency_key: input.idempotency_key,
            status: IntegrationRunStatus::Started,
            http_status: None,
            attempts: 0,
            started_at: Utc::now(),
            finished_at: None,
            response_payload: None,
            error_message: None,
            external_run_id: None,
        };
        runs.push(run.clone());

        Ok(CreateRunOutcome::Created(run))
    }

    async fn apply_update(
        &self,
        tenant_id: TenantId,
        run_id: &str,
        update: RunUpdate,
    ) -> AppResult<RunTransitionOutcome> {
        let mut runs = self.runs.lock().await;
        let run = runs
            .iter_mut()
            .find(|run| run.tenant_id == tenant_id && run.run_id == run_id)
            .ok_or_else(|| AppError::NotFound(format!("integration run '{run_id}' not found")))?;

        if !update.transition.source_statuses().contains(&run.status) {
            return Ok(RunTransitionOutcome::Rejected(run.clone()));
        }

        let target = update.transition.target_status();
        run.status = target;
        if update.http_status.is_some() {
            run.http_status = update.http_status;
        }
        if let Some(attempts) = update.attempts {
            run.attempts = attempts;
        }
        if update.response_payload.is_some() {
            run.response_payload = update.response_payload;
        }
        if update.error_message.is_some() {
            run.error_message = update.error_message;
        }
        if update.external_run_id.is_some() {
            run.external_run_id = update.external_run_id;
        }
        if target.is_terminal() {
            run.finished_at = Some(Utc::now());
        }

        Ok(RunTransitionOutcome::Applied(run.clone()))
    }

    async fn find_run(
        &self,
        tenant_scope: Option<TenantId>,
        run_id: &str,
    ) -> AppResult<Option<IntegrationRun>> {
        let runs = self.runs.lock().await;
        Ok(runs
            .iter()
            .find(|run| {
                run.run_id == run_id && tenant_scope.is_none_or(|tenant_id| run.tenant_id == tenant_id)
            })
            .cloned())
    }

    async fn find_runs_by_request_id(
        &self,
        tenant_scope: Option<TenantId>,
        request_id: &str,
    ) -> AppResult<Vec<IntegrationRun>> {
        let runs = self.runs.lock().await;
        let mut matches: Vec<IntegrationRun> = runs
            .iter()
            .filter(|run| {
                run.request_id == request_id
                    && tenant_scope.is_none_or(|tenant_id| run.tenant_id == tenant_id)
            })
            .cloned()
            .collect();
        newest_first(&mut matches);
        Ok(matches)
    }

    async fn list_runs(
        &self,
        tenant_id: TenantId,
        query: IntegrationRunListQuery,
    ) -> AppResult<Vec<IntegrationRun>> {
        let runs = self.runs.lock().await;
        let mut matches: Vec<IntegrationRun> = runs
            .iter()
            .filter(|run| {
                run.tenant_id == tenant_id
                    && query
                        .action_name
                        .as_deref()
                        .is_none_or(|action_name| run.action_name == action_name)
                    && query.status.is_none_or(|status| run.status == status)
            })
            .cloned()
            .collect();
        newest_first(&mut matches);
        Ok(matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

/// Process-local fixed-window rate limiter.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitRepository {
    windows: Mutex<HashMap<(TenantId, ProviderAdapter), RateLimitWindow>>,
}

impl InMemoryRateLimitRepository {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn try_admit(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        limit_per_minute: u32,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let mut windows = self.windows.lock().await;
        let key = (tenant_id, provider.clone());
        let (window, decision) =
            RateLimitWindow::admit(windows.get(&key).copied(), now, limit_per_minute);
        windows.insert(key, window);
        Ok(decision)
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut windows = self.windows.lock().await;
        let previous = windows.len();
        windows.retain(|_, window| window.window_start >= before);
        Ok(u64::try_from(previous - windows.len()).unwrap_or_default())
    }
}

/// Provider endpoints registered in process memory.
#[derive(Debug, Default)]
pub struct InMemoryProviderEndpointResolver {
    endpoints: RwLock<HashMap<(TenantId, ProviderAdapter), ProviderEndpoint>>,
}

impl InMemoryProviderEndpointResolver {
    /// Creates a resolver with no endpoints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver seeded with endpoints. Later entries replace earlier ones.
    #[must_use]
    pub fn with_endpoints(
        endpoints: impl IntoIterator<Item = (TenantId, ProviderAdapter, ProviderEndpoint)>,
    ) -> Self {
        Self {
            endpoints: RwLock::new(
                endpoints
                    .into_iter()
                    .map(|(tenant_id, provider, endpoint)| ((tenant_id, provider), endpoint))
                    .collect(),
            ),
        }
    }

    /// Registers or replaces the endpoint for one tenant and adapter.
    pub async fn register(
        &self,
        tenant_id: TenantId,
        provider: ProviderAdapter,
        endpoint: ProviderEndpoint,
    ) {
        self.endpoints
            .write()
            .await
            .insert((tenant_id, provider), endpoint);
    }
}

#[async_trait]
impl ProviderEndpointResolver for InMemoryProviderEndpointResolver {
    async fn resolve_endpoint(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
    ) -> AppResult<Option<ProviderEndpoint>> {
        Ok(self
            .endpoints
            .read()
            .await
            .get(&(tenant_id, provider.clone()))
            .cloned())
    }
}

/// In-memory usage audit log.
#[derive(Debug, Default)]
pub struct InMemoryUsageAuditLog {
    entries: RwLock<Vec<UsageAuditEntry>>,
}

impl InMemoryUsageAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageAuditSink for InMemoryUsageAuditLog {
    async fn append_entry(&self, entry: UsageAuditEntry) -> AppResult<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl UsageAuditReader for InMemoryUsageAuditLog {
    async fn list_entries(
        &self,
        tenant_id: TenantId,
        query: UsageAuditQuery,
    ) -> AppResult<Vec<UsageAuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .filter(|entry| {
                entry.tenant_id == tenant_id
                    && query
                        .action_name
                        .as_deref()
                        .is_none_or(|action_name| entry.action_name == action_name)
                    && query.status.is_none_or(|status| entry.status == status)
            })
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests;
