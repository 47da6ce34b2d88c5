use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::{AppResult, TenantId};
use flowgate_domain::{IntegrationRunStatus, ProviderAdapter, RunTransition};
use serde_json::Value;

/// Persisted ledger row for one logical dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationRun {
    /// Opaque run identifier assigned at creation.
    pub run_id: String,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Provider adapter used for the dispatch.
    pub provider: ProviderAdapter,
    /// Qualified action name, e.g. `erp.sync_customers`.
    pub action_name: String,
    /// Action definition version that was dispatched.
    pub action_version: u32,
    /// Caller correlation id, not unique.
    pub request_id: String,
    /// Optional caller idempotency key.
    pub idempotency_key: Option<String>,
    /// Lifecycle status.
    pub status: IntegrationRunStatus,
    /// Last provider HTTP status, if the provider answered.
    pub http_status: Option<u16>,
    /// Outbound HTTP calls made for the run.
    pub attempts: u32,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Terminal timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Provider result payload.
    pub response_payload: Option<Value>,
    /// Failure details.
    pub error_message: Option<String>,
    /// Provider-side run identifier reported by callback.
    pub external_run_id: Option<String>,
}

/// Run creation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIntegrationRunInput {
    /// Provider adapter used for the dispatch.
    pub provider: ProviderAdapter,
    /// Qualified action name.
    pub action_name: String,
    /// Action definition version.
    pub action_version: u32,
    /// Caller correlation id.
    pub request_id: String,
    /// Optional caller idempotency key.
    pub idempotency_key: Option<String>,
    /// Terminal runs with the same key finished at or after this instant are reused.
    pub reuse_finished_since: DateTime<Utc>,
}

/// Result of idempotent run creation.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateRunOutcome {
    /// A new `started` row was written.
    Created(IntegrationRun),
    /// A matching non-terminal or recent run already exists.
    Existing(IntegrationRun),
}

/// Conditional status update applied as one compare-and-swap.
#[derive(Debug, Clone, PartialEq)]
pub struct RunUpdate {
    /// Lifecycle event; its source statuses form the swap condition.
    pub transition: RunTransition,
    /// Provider HTTP status to record.
    pub http_status: Option<u16>,
    /// Attempt count to record.
    pub attempts: Option<u32>,
    /// Result payload to attach.
    pub response_payload: Option<Value>,
    /// Failure details to attach.
    pub error_message: Option<String>,
    /// Provider-side run id to attach.
    pub external_run_id: Option<String>,
}

impl RunUpdate {
    /// Creates an update carrying only the lifecycle event.
    #[must_use]
    pub fn new(transition: RunTransition) -> Self {
        Self {
            transition,
            http_status: None,
            attempts: None,
            response_payload: None,
            error_message: None,
            external_run_id: None,
        }
    }
}

/// Result of a conditional status update.
#[derive(Debug, Clone, PartialEq)]
pub enum RunTransitionOutcome {
    /// Row matched the source statuses and was updated.
    Applied(IntegrationRun),
    /// Row was in another status; returned unchanged.
    Rejected(IntegrationRun),
}

/// Ledger listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationRunListQuery {
    /// Optional qualified action name filter.
    pub action_name: Option<String>,
    /// Optional status filter.
    pub status: Option<IntegrationRunStatus>,
    /// Page size.
    pub limit: usize,
    /// Row offset.
    pub offset: usize,
}

/// Repository port for the run ledger.
///
/// Rows are never deleted. Every status change goes through `apply_update`.
#[async_trait]
pub trait IntegrationRunRepository: Send + Sync {
    /// Creates a `started` run unless an idempotent match exists.
    ///
    /// Lookup and insert must be atomic for one `(tenant, idempotency_key)`.
    async fn create_run(
        &self,
        tenant_id: TenantId,
        input: CreateIntegrationRunInput,
    ) -> AppResult<CreateRunOutcome>;

    /// Applies an update only if the row is in one of the transition's source statuses.
    ///
    /// Sets `finished_at` when the target status is terminal. Returns `NotFound` when the
    /// row does not exist.
    async fn apply_update(
        &self,
        tenant_id: TenantId,
        run_id: &str,
        update: RunUpdate,
    ) -> AppResult<RunTransitionOutcome>;

    /// Finds one run by id, optionally restricted to a tenant.
    async fn find_run(
        &self,
        tenant_scope: Option<TenantId>,
        run_id: &str,
    ) -> AppResult<Option<IntegrationRun>>;

    /// Finds runs sharing a request id, most recently started first.
    async fn find_runs_by_request_id(
        &self,
        tenant_scope: Option<TenantId>,
        request_id: &str,
    ) -> AppResult<Vec<IntegrationRun>>;

    /// Lists runs for a tenant, most recently started first.
    async fn list_runs(
        &self,
        tenant_id: TenantId,
        query: IntegrationRunListQuery,
    ) -> AppResult<Vec<IntegrationRun>>;
}
