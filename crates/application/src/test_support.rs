//! In-memory fakes shared by application service tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{
    ActionDefinition, ActionDefinitionInput, ActionInputSchema, FieldRequirement,
    IntegrationRunStatus, ProviderAdapter, RateLimitDecision, RateLimitWindow,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::integration_ports::{
    ActionDefinitionRepository, CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun,
    IntegrationRunListQuery, IntegrationRunRepository, ProviderCallResult, ProviderClient,
    ProviderEndpoint, ProviderEndpointResolver, ProviderInvocation, RunTransitionOutcome,
    RunUpdate, UsageAuditEntry, UsageAuditQuery, UsageAuditReader, UsageAuditSink,
};
use crate::rate_limit_service::RateLimitRepository;

pub fn definition(
    app_key: &str,
    action_key: &str,
    version: u32,
    enabled: bool,
    created_at: DateTime<Utc>,
) -> ActionDefinition {
    let schema = ActionInputSchema::new(BTreeMap::from([
        ("customer_id".to_owned(), FieldRequirement::Required),
        ("note".to_owned(), FieldRequirement::Optional),
    ]))
    .unwrap_or_else(|_| unreachable!());

    ActionDefinition::new(ActionDefinitionInput {
        app_key: app_key.to_owned(),
        action_key: action_key.to_owned(),
        version,
        display_name: None,
        provider: ProviderAdapter::webhook_workflow(),
        enabled,
        input_schema: schema,
        output_schema: None,
        created_at,
    })
    .unwrap_or_else(|_| unreachable!())
}

#[derive(Default)]
pub struct FakeActionDefinitionRepository {
    definitions: Mutex<Vec<(TenantId, ActionDefinition)>>,
}

impl FakeActionDefinitionRepository {
    pub async fn insert(&self, tenant_id: TenantId, definition: ActionDefinition) {
        self.definitions.lock().await.push((tenant_id, definition));
    }
}

fn same_action(definition: &ActionDefinition, app_key: &str, action_key: &str) -> bool {
    definition.app_key().as_str() == app_key && definition.action_key().as_str() == action_key
}

#[async_trait]
impl ActionDefinitionRepository for FakeActionDefinitionRepository {
    async fn save_definition(
        &self,
        tenant_id: TenantId,
        definition: ActionDefinition,
    ) -> AppResult<ActionDefinition> {
        let mut definitions = self.definitions.lock().await;
        let existing = definitions.iter().position(|(stored_tenant, stored)| {
            *stored_tenant == tenant_id
                && same_action(
                    stored,
                    definition.app_key().as_str(),
                    definition.action_key().as_str(),
                )
                && stored.version() == definition.version()
        });
        let stored = match existing {
            Some(index) => {
                let (_, previous) = definitions.remove(index);
                definition.with_created_at(previous.created_at())
            }
            None => definition,
        };
        definitions.push((tenant_id, stored.clone()));
        Ok(stored)
    }

    async fn find_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
        version: u32,
    ) -> AppResult<Option<ActionDefinition>> {
        Ok(self
            .definitions
            .lock()
            .await
            .iter()
            .find(|(stored_tenant, stored)| {
                *stored_tenant == tenant_id
                    && same_action(stored, app_key, action_key)
                    && stored.version() == version
            })
            .map(|(_, stored)| stored.clone()))
    }

    async fn find_latest_enabled_definition(
        &self,
        tenant_id: TenantId,
        app_key: &str,
        action_key: &str,
    ) -> AppResult<Option<ActionDefinition>> {
        Ok(self
            .definitions
            .lock()
            .await
            .iter()
            .filter(|(stored_tenant, stored)| {
                *stored_tenant == tenant_id
                    && stored.is_enabled()
                    && same_action(stored, app_key, action_key)
            })
            .max_by_key(|(_, stored)| (stored.created_at(), stored.version()))
            .map(|(_, stored)| stored.clone()))
    }

    async fn list_definitions(&self, tenant_id: TenantId) -> AppResult<Vec<ActionDefinition>> {
        let mut listed: Vec<ActionDefinition> = self
            .definitions
            .lock()
            .await
            .iter()
            .filter(|(stored_tenant, _)| *stored_tenant == tenant_id)
            .map(|(_, stored)| stored.clone())
            .collect();
        listed.sort_by_key(|stored| (stored.qualified_name(), stored.version()));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct FakeRunRepository {
    runs: Mutex<Vec<IntegrationRun>>,
    next_id: AtomicU64,
}

impl FakeRunRepository {
    pub async fn runs(&self) -> Vec<IntegrationRun> {
        self.runs.lock().await.clone()
    }

    pub async fn insert(&self, run: IntegrationRun) {
        self.runs.lock().await.push(run);
    }
}

pub fn started_run(tenant_id: TenantId, run_id: &str, request_id: &str) -> IntegrationRun {
    IntegrationRun {
        run_id: run_id.to_owned(),
        tenant_id,
        provider: ProviderAdapter::webhook_workflow(),
        action_name: "erp.sync_customers".to_owned(),
        action_version: 1,
        request_id: request_id.to_owned(),
        idempotency_key: None,
        status: IntegrationRunStatus::Started,
        http_status: None,
        attempts: 0,
        started_at: Utc::now(),
        finished_at: None,
        response_payload: None,
        error_message: None,
        external_run_id: None,
    }
}

fn sort_newest_first(runs: &mut [IntegrationRun]) {
    runs.sort_by(|left, right| {
        (right.started_at, right.run_id.as_str()).cmp(&(left.started_at, left.run_id.as_str()))
    });
}

#[async_trait]
impl IntegrationRunRepository for FakeRunRepository {
    async fn create_run(
        &self,
        tenant_id: TenantId,
        input: CreateIntegrationRunInput,
    ) -> AppResult<CreateRunOutcome> {
        let mut runs = self.runs.lock().await;

        if let Some(key) = input.idempotency_key.as_deref() {
            let existing = runs.iter().rev().find(|run| {
                run.tenant_id == tenant_id
                    && run.idempotency_key.as_deref() == Some(key)
                    && run
                        .finished_at
                        .is_none_or(|finished_at| finished_at >= input.reuse_finished_since)
            });
            if let Some(existing) = existing {
                return Ok(CreateRunOutcome::Existing(existing.clone()));
            }
        }

        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let run = IntegrationRun {
            run_id: format!("run-{sequence}"),
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
        if let Some(http_status) = update.http_status {
            run.http_status = Some(http_status);
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
        Ok(self
            .runs
            .lock()
            .await
            .iter()
            .find(|run| {
                run.run_id == run_id && tenant_scope.is_none_or(|tenant| tenant == run.tenant_id)
            })
            .cloned())
    }

    async fn find_runs_by_request_id(
        &self,
        tenant_scope: Option<TenantId>,
        request_id: &str,
    ) -> AppResult<Vec<IntegrationRun>> {
        let mut matches: Vec<IntegrationRun> = self
            .runs
            .lock()
            .await
            .iter()
            .filter(|run| {
                run.request_id == request_id
                    && tenant_scope.is_none_or(|tenant| tenant == run.tenant_id)
            })
            .cloned()
            .collect();
        sort_newest_first(&mut matches);
        Ok(matches)
    }

    async fn list_runs(
        &self,
        tenant_id: TenantId,
        query: IntegrationRunListQuery,
    ) -> AppResult<Vec<IntegrationRun>> {
        let mut matches: Vec<IntegrationRun> = self
            .runs
            .lock()
            .await
            .iter()
            .filter(|run| run.tenant_id == tenant_id)
            .filter(|run| {
                query
                    .action_name
                    .as_deref()
                    .is_none_or(|name| run.action_name == name)
            })
            .filter(|run| query.status.is_none_or(|status| run.status == status))
            .cloned()
            .collect();
        sort_newest_first(&mut matches);
        Ok(matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

#[derive(Default)]
pub struct FakeRateLimitRepository {
    windows: Mutex<HashMap<(TenantId, ProviderAdapter), RateLimitWindow>>,
}

#[async_trait]
impl RateLimitRepository for FakeRateLimitRepository {
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
        let before_count = windows.len();
        windows.retain(|_, window| window.window_start >= before);
        Ok(u64::try_from(before_count - windows.len()).unwrap_or_default())
    }
}

pub struct StaticEndpointResolver {
    endpoint: Option<ProviderEndpoint>,
}

impl StaticEndpointResolver {
    pub fn configured() -> Self {
        let url = Url::parse("https://provider.test/hooks/dispatch")
            .unwrap_or_else(|_| unreachable!());
        Self {
            endpoint: Some(ProviderEndpoint {
                url,
                bearer_token: Some("provider-secret".to_owned()),
            }),
        }
    }

    pub fn missing() -> Self {
        Self { endpoint: None }
    }
}

#[async_trait]
impl ProviderEndpointResolver for StaticEndpointResolver {
    async fn resolve_endpoint(
        &self,
        _tenant_id: TenantId,
        _provider: &ProviderAdapter,
    ) -> AppResult<Option<ProviderEndpoint>> {
        Ok(self.endpoint.clone())
    }
}

/// Replays scripted call results in order and records when each call happened.
pub struct ScriptedProviderClient {
    script: Mutex<VecDeque<ProviderCallResult>>,
    calls: Mutex<Vec<(Instant, ProviderInvocation)>>,
}

impl ScriptedProviderClient {
    pub fn new(script: Vec<ProviderCallResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<(Instant, ProviderInvocation)> {
        self.calls.lock().await.clone()
    }
}

pub fn responded(status: u16, body: &str) -> ProviderCallResult {
    ProviderCallResult::Responded {
        status,
        body: body.to_owned(),
    }
}

pub fn connection_refused() -> ProviderCallResult {
    ProviderCallResult::Unreachable {
        message: "connection refused".to_owned(),
    }
}

#[async_trait]
impl ProviderClient for ScriptedProviderClient {
    async fn invoke(
        &self,
        _endpoint: &ProviderEndpoint,
        invocation: &ProviderInvocation,
    ) -> ProviderCallResult {
        self.calls
            .lock()
            .await
            .push((Instant::now(), invocation.clone()));
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(connection_refused)
    }
}

#[derive(Default)]
pub struct RecordingUsageAuditSink {
    entries: Mutex<Vec<UsageAuditEntry>>,
}

impl RecordingUsageAuditSink {
    pub async fn entries(&self) -> Vec<UsageAuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl UsageAuditSink for RecordingUsageAuditSink {
    async fn append_entry(&self, entry: UsageAuditEntry) -> AppResult<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }
}

#[async_trait]
impl UsageAuditReader for RecordingUsageAuditSink {
    async fn list_entries(
        &self,
        tenant_id: TenantId,
        query: UsageAuditQuery,
    ) -> AppResult<Vec<UsageAuditEntry>> {
        let mut matches: Vec<UsageAuditEntry> = self
            .entries
            .lock()
            .await
            .iter()
            .filter(|entry| entry.tenant_id == tenant_id)
            .filter(|entry| {
                query
                    .action_name
                    .as_deref()
                    .is_none_or(|name| entry.action_name == name)
            })
            .filter(|entry| query.status.is_none_or(|status| entry.status == status))
            .cloned()
            .collect();
        matches.reverse();
        Ok(matches
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }
}

pub struct FailingUsageAuditSink;

#[async_trait]
impl UsageAuditSink for FailingUsageAuditSink {
    async fn append_entry(&self, _entry: UsageAuditEntry) -> AppResult<()> {
        Err(AppError::Internal("audit store unavailable".to_owned()))
    }
}
