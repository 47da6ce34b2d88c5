//! Outbound action dispatch through provider adapters.
//!
//! Every dispatch writes its ledger row before any network call, so a crash or
//! cancellation mid-flight leaves a `started` or `in_progress` run behind instead of an
//! unrecorded side effect at the provider.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowgate_core::{AppError, AppResult, CallerIdentity};
use flowgate_domain::{ActionDefinition, IntegrationRunStatus, RateLimitDecision, RunTransition};
use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::action_registry::ActionRegistry;
use crate::integration_ports::{
    CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun, IntegrationRunRepository,
    ProviderEndpointResolver, ProviderInvocation, RunTransitionOutcome, RunUpdate,
    UsageAuditEntry, UsageAuditStatus,
};
use crate::provider_registry::ProviderRegistry;
use crate::rate_limit_service::RateLimitService;
use crate::usage_audit_logger::UsageAuditLogger;

mod classify;
mod retry;

pub use retry::RetryPolicy;

use classify::AttemptClassification;

/// Caller context for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    /// Authenticated caller, carrying the tenant scope.
    pub caller: CallerIdentity,
    /// Caller correlation id.
    pub request_id: String,
    /// Optional caller idempotency key.
    pub idempotency_key: Option<String>,
}

/// Result of a dispatch that reached the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Run reached a terminal status.
    Completed(IntegrationRun),
    /// Provider accepted the action; completion arrives by callback.
    Accepted(IntegrationRun),
    /// Idempotency key matched an existing run; nothing was sent.
    Deduplicated(IntegrationRun),
}

impl DispatchOutcome {
    /// Returns the ledger run behind the outcome.
    #[must_use]
    pub fn run(&self) -> &IntegrationRun {
        match self {
            Self::Completed(run) | Self::Accepted(run) | Self::Deduplicated(run) => run,
        }
    }
}

/// Dispatch tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Retry schedule for unreachable providers.
    pub retry_policy: RetryPolicy,
    /// How long a finished run keeps answering for its idempotency key.
    pub idempotency_window: chrono::Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            idempotency_window: chrono::Duration::hours(24),
        }
    }
}

/// Application service dispatching tenant actions to providers.
#[derive(Clone)]
pub struct DispatchService {
    action_registry: ActionRegistry,
    rate_limit_service: RateLimitService,
    run_repository: Arc<dyn IntegrationRunRepository>,
    endpoint_resolver: Arc<dyn ProviderEndpointResolver>,
    providers: ProviderRegistry,
    audit_logger: UsageAuditLogger,
    settings: DispatchSettings,
}

impl DispatchService {
    /// Creates a dispatch service.
    #[must_use]
    pub fn new(
        action_registry: ActionRegistry,
        rate_limit_service: RateLimitService,
        run_repository: Arc<dyn IntegrationRunRepository>,
        endpoint_resolver: Arc<dyn ProviderEndpointResolver>,
        providers: ProviderRegistry,
        audit_logger: UsageAuditLogger,
    ) -> Self {
        Self {
            action_registry,
            rate_limit_service,
            run_repository,
            endpoint_resolver,
            providers,
            audit_logger,
            settings: DispatchSettings::default(),
        }
    }

    /// Replaces the default retry and idempotency settings.
    #[must_use]
    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Resolves, validates and dispatches one action invocation.
    pub async fn invoke_action(
        &self,
        context: &DispatchContext,
        app_key: &str,
        action_key: &str,
        version: Option<u32>,
        input: Value,
    ) -> AppResult<DispatchOutcome> {
        let started = Instant::now();
        let tenant_id = context.caller.tenant_id();

        let resolved = self
            .action_registry
            .resolve(tenant_id, app_key, action_key, version)
            .await
            .and_then(|definition| {
                self.action_registry
                    .validate(&definition, &input)
                    .map(|()| definition)
            });

        let definition = match resolved {
            Ok(definition) => definition,
            Err(error) => {
                self.record(
                    context,
                    format!("{app_key}.{action_key}"),
                    None,
                    UsageAuditStatus::Rejected,
                    started,
                    Some(error.to_string()),
                )
                .await;
                return Err(error);
            }
        };

        self.dispatch_from(&definition, input, context, started)
            .await
    }

    /// Dispatches an already resolved and validated definition.
    pub async fn dispatch(
        &self,
        definition: &ActionDefinition,
        input: Value,
        context: &DispatchContext,
    ) -> AppResult<DispatchOutcome> {
        self.dispatch_from(definition, input, context, Instant::now())
            .await
    }

    async fn dispatch_from(
        &self,
        definition: &ActionDefinition,
        input: Value,
        context: &DispatchContext,
        started: Instant,
    ) -> AppResult<DispatchOutcome> {
        let tenant_id = context.caller.tenant_id();
        let action_name = definition.qualified_name();
        let provider = definition.provider();

        if let RateLimitDecision::Limited {
            retry_after_seconds,
        } = self.rate_limit_service.admit(tenant_id, provider).await?
        {
            let message = format!(
                "provider '{provider}' rate limit reached for tenant '{tenant_id}', retry in {retry_after_seconds}s"
            );
            self.record(
                context,
                action_name,
                None,
                UsageAuditStatus::RateLimited,
                started,
                Some(message.clone()),
            )
            .await;
            return Err(AppError::RateLimited(message));
        }

        let created = self
            .run_repository
            .create_run(
                tenant_id,
                CreateIntegrationRunInput {
                    provider: provider.clone(),
                    action_name: action_name.clone(),
                    action_version: definition.version(),
                    request_id: context.request_id.clone(),
                    idempotency_key: context.idempotency_key.clone(),
                    reuse_finished_since: Utc::now()
                        .checked_sub_signed(self.settings.idempotency_window)
                        .unwrap_or(DateTime::<Utc>::MIN_UTC),
                },
            )
            .await?;

        let run = match created {
            CreateRunOutcome::Created(run) => run,
            CreateRunOutcome::Existing(run) => {
                info!(
                    tenant_id = %tenant_id,
                    run_id = %run.run_id,
                    action = %action_name,
                    status = run.status.as_str(),
                    "idempotency key matched existing integration run"
                );
                return Ok(DispatchOutcome::Deduplicated(run));
            }
        };

        let endpoint = match self
            .endpoint_resolver
            .resolve_endpoint(tenant_id, provider)
            .await
        {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                let message = format!("no endpoint configured for provider '{provider}'");
                return self.abort(context, &run, message, started).await;
            }
            Err(error) => {
                let message = format!("provider endpoint lookup failed: {error}");
                return self.abort(context, &run, message, started).await;
            }
        };
        let Some(client) = self.providers.client_for(provider) else {
            let message = format!("provider adapter '{provider}' is not registered");
            return self.abort(context, &run, message, started).await;
        };

        let invocation = ProviderInvocation {
            run_id: run.run_id.clone(),
            tenant_id,
            request_id: context.request_id.clone(),
            idempotency_key: context.idempotency_key.clone(),
            body: json!({
                "context": {
                    "tenant_id": tenant_id.to_string(),
                    "user_id": context.caller.user_id(),
                    "roles": context.caller.roles(),
                    "request_id": context.request_id,
                },
                "action": action_name,
                "input": input,
                "idempotency_key": context.idempotency_key,
            }),
        };

        let max_attempts = self.settings.retry_policy.max_attempts();
        let mut attempt = 1;
        let update = loop {
            let result = client.invoke(&endpoint, &invocation).await;
            match AttemptClassification::from_call_result(result) {
                AttemptClassification::Unreachable { message } => {
                    match self.settings.retry_policy.delay_after(attempt) {
                        Some(delay) => {
                            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                            warn!(
                                tenant_id = %tenant_id,
                                run_id = %run.run_id,
                                attempt,
                                max_attempts,
                                delay_ms,
                                error = %message,
                                "provider unreachable, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            warn!(
                                tenant_id = %tenant_id,
                                run_id = %run.run_id,
                                attempts = attempt,
                                error = %message,
                                "provider unreachable, retries exhausted"
                            );
                            break AttemptClassification::Unreachable { message }
                                .into_update(attempt);
                        }
                    }
                }
                classification => break classification.into_update(attempt),
            }
        };

        self.finish(context, &run, update, started).await
    }

    async fn abort(
        &self,
        context: &DispatchContext,
        run: &IntegrationRun,
        message: String,
        started: Instant,
    ) -> AppResult<DispatchOutcome> {
        warn!(
            tenant_id = %run.tenant_id,
            run_id = %run.run_id,
            error = %message,
            "dispatch aborted before contacting provider"
        );
        let mut update = RunUpdate::new(RunTransition::DispatchAborted);
        update.error_message = Some(message);
        self.finish(context, run, update, started).await
    }

    async fn finish(
        &self,
        context: &DispatchContext,
        run: &IntegrationRun,
        update: RunUpdate,
        started: Instant,
    ) -> AppResult<DispatchOutcome> {
        let transition = update.transition;
        let outcome = self
            .run_repository
            .apply_update(run.tenant_id, run.run_id.as_str(), update)
            .await?;

        let run = match outcome {
            RunTransitionOutcome::Applied(run) => {
                info!(
                    tenant_id = %run.tenant_id,
                    run_id = %run.run_id,
                    action = %run.action_name,
                    status = run.status.as_str(),
                    http_status = run.http_status,
                    attempts = run.attempts,
                    "integration run updated by dispatcher"
                );
                let audit_status = match run.status {
                    IntegrationRunStatus::Succeeded => UsageAuditStatus::Succeeded,
                    IntegrationRunStatus::Failed => UsageAuditStatus::Failed,
                    IntegrationRunStatus::Started | IntegrationRunStatus::InProgress => {
                        UsageAuditStatus::Accepted
                    }
                };
                self.record(
                    context,
                    run.action_name.clone(),
                    Some(run.run_id.clone()),
                    audit_status,
                    started,
                    run.error_message.clone(),
                )
                .await;
                run
            }
            RunTransitionOutcome::Rejected(run) => {
                info!(
                    tenant_id = %run.tenant_id,
                    run_id = %run.run_id,
                    status = run.status.as_str(),
                    transition = ?transition,
                    "integration run already advanced by callback"
                );
                run
            }
        };

        if run.status.is_terminal() {
            Ok(DispatchOutcome::Completed(run))
        } else {
            Ok(DispatchOutcome::Accepted(run))
        }
    }

    async fn record(
        &self,
        context: &DispatchContext,
        action_name: String,
        run_id: Option<String>,
        status: UsageAuditStatus,
        started: Instant,
        error_message: Option<String>,
    ) {
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.audit_logger
            .record(UsageAuditEntry {
                tenant_id: context.caller.tenant_id(),
                action_name,
                run_id,
                status,
                duration_ms,
                error_message,
                request_id: context.request_id.clone(),
                created_at: Utc::now(),
            })
            .await;
    }
}
