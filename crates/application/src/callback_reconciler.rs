use std::sync::Arc;

use chrono::Utc;
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{IntegrationRunStatus, RunTransition};
use serde_json::Value;
use tracing::{info, warn};

use crate::integration_ports::{
    IntegrationRun, IntegrationRunRepository, RunTransitionOutcome, RunUpdate, UsageAuditEntry,
    UsageAuditStatus,
};
use crate::usage_audit_logger::UsageAuditLogger;

/// Failure details reported by a provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackError {
    /// Provider error message.
    pub message: String,
    /// Optional provider error code.
    pub code: Option<String>,
}

/// Completion notification pushed by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackNotification {
    /// Restricts the lookup to one tenant when the caller is tenant-bound.
    pub tenant_scope: Option<TenantId>,
    /// Ledger run id echoed from the `X-Run-Id` dispatch header.
    pub run_id: Option<String>,
    /// Caller correlation id, used when no run id is given.
    pub request_id: Option<String>,
    /// Reported status, `succeeded` or `failed`.
    pub status: String,
    /// Provider-side run identifier.
    pub external_run_id: Option<String>,
    /// Provider result payload.
    pub result: Option<Value>,
    /// Provider failure details.
    pub error: Option<CallbackError>,
}

/// Result of reconciling one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The run moved to the reported terminal status.
    Applied(IntegrationRun),
    /// The run was already terminal and is returned unchanged.
    AlreadyTerminal(IntegrationRun),
}

/// Applies provider callbacks to the run ledger.
#[derive(Clone)]
pub struct CallbackReconciler {
    run_repository: Arc<dyn IntegrationRunRepository>,
    audit_logger: UsageAuditLogger,
}

impl CallbackReconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(
        run_repository: Arc<dyn IntegrationRunRepository>,
        audit_logger: UsageAuditLogger,
    ) -> Self {
        Self {
            run_repository,
            audit_logger,
        }
    }

    /// Moves the referenced run to the reported terminal status.
    ///
    /// Unknown runs fail with `NotFound` and nothing is written. Terminal runs are left
    /// untouched. Concurrent callbacks for one run race on a compare-and-swap and only the
    /// first one is applied.
    pub async fn reconcile(
        &self,
        notification: CallbackNotification,
    ) -> AppResult<ReconcileOutcome> {
        let transition = RunTransition::from_callback_status(notification.status.as_str())?;
        let run = self.locate(&notification).await?;

        if run.status.is_terminal() {
            info!(
                tenant_id = %run.tenant_id,
                run_id = %run.run_id,
                status = run.status.as_str(),
                reported = %notification.status,
                "callback ignored, integration run already terminal"
            );
            return Ok(ReconcileOutcome::AlreadyTerminal(run));
        }

        let mut update = RunUpdate::new(transition);
        update.external_run_id = notification.external_run_id;
        update.response_payload = notification.result;
        if transition == RunTransition::CallbackFailed {
            update.error_message = Some(failure_message(notification.error));
        }

        match self
            .run_repository
            .apply_update(run.tenant_id, run.run_id.as_str(), update)
            .await?
        {
            RunTransitionOutcome::Applied(run) => {
                info!(
                    tenant_id = %run.tenant_id,
                    run_id = %run.run_id,
                    status = run.status.as_str(),
                    external_run_id = run.external_run_id.as_deref(),
                    "integration run reconciled from callback"
                );
                self.record(&run).await;
                Ok(ReconcileOutcome::Applied(run))
            }
            RunTransitionOutcome::Rejected(run) => {
                info!(
                    tenant_id = %run.tenant_id,
                    run_id = %run.run_id,
                    status = run.status.as_str(),
                    reported = %notification.status,
                    "callback lost race, integration run already terminal"
                );
                Ok(ReconcileOutcome::AlreadyTerminal(run))
            }
        }
    }

    async fn locate(&self, notification: &CallbackNotification) -> AppResult<IntegrationRun> {
        let scope = notification.tenant_scope;

        if let Some(run_id) = notification.run_id.as_deref() {
            return self
                .run_repository
                .find_run(scope, run_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("integration run '{run_id}' not found"))
                });
        }

        let Some(request_id) = notification.request_id.as_deref() else {
            return Err(AppError::Validation(
                "callback must carry run_id or request_id".to_owned(),
            ));
        };

        let candidates = self
            .run_repository
            .find_runs_by_request_id(scope, request_id)
            .await?;
        if candidates.len() > 1 {
            warn!(
                request_id,
                candidates = candidates.len(),
                "several integration runs share a request id, picking most recent open run"
            );
        }

        let open = candidates
            .iter()
            .position(|run| !run.status.is_terminal())
            .unwrap_or(0);
        candidates.into_iter().nth(open).ok_or_else(|| {
            AppError::NotFound(format!(
                "no integration run found for request id '{request_id}'"
            ))
        })
    }

    async fn record(&self, run: &IntegrationRun) {
        let finished_at = run.finished_at.unwrap_or_else(Utc::now);
        let duration_ms =
            u64::try_from((finished_at - run.started_at).num_milliseconds()).unwrap_or_default();
        let status = if run.status == IntegrationRunStatus::Succeeded {
            UsageAuditStatus::Succeeded
        } else {
            UsageAuditStatus::Failed
        };

        self.audit_logger
            .record(UsageAuditEntry {
                tenant_id: run.tenant_id,
                action_name: run.action_name.clone(),
                run_id: Some(run.run_id.clone()),
                status,
                duration_ms,
                error_message: run.error_message.clone(),
                request_id: run.request_id.clone(),
                created_at: Utc::now(),
            })
            .await;
    }
}

fn failure_message(error: Option<CallbackError>) -> String {
    match error {
        Some(CallbackError {
            message,
            code: Some(code),
        }) => format!("{message} (code {code})"),
        Some(CallbackError {
            message,
            code: None,
        }) => message,
        None => "provider reported failure".to_owned(),
    }
}
