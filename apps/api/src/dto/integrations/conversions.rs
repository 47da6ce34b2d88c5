use chrono::Utc;
use flowgate_application::{
    CallbackError, DispatchOutcome, IntegrationRun, ReconcileOutcome, UsageAuditEntry,
};
use flowgate_core::AppError;
use flowgate_domain::{ActionDefinition, ActionDefinitionInput, ActionInputSchema, ProviderAdapter};

use super::types::{
    ActionDefinitionResponse, CallbackErrorRequest, CallbackOutcomeDto, CallbackResponse,
    IntegrationRunResponse, InvokeActionResponse, InvokeOutcomeDto, SaveActionDefinitionRequest,
    UsageAuditEntryResponse,
};

impl From<IntegrationRun> for IntegrationRunResponse {
    fn from(value: IntegrationRun) -> Self {
        Self {
            run_id: value.run_id,
            tenant_id: value.tenant_id.to_string(),
            provider: value.provider.to_string(),
            action_name: value.action_name,
            action_version: value.action_version,
            request_id: value.request_id,
            idempotency_key: value.idempotency_key,
            status: value.status.as_str().to_owned(),
            http_status: value.http_status,
            attempts: value.attempts,
            started_at: value.started_at.to_rfc3339(),
            finished_at: value.finished_at.map(|finished_at| finished_at.to_rfc3339()),
            response_payload: value.response_payload,
            error_message: value.error_message,
            external_run_id: value.external_run_id,
        }
    }
}

impl From<DispatchOutcome> for InvokeActionResponse {
    fn from(value: DispatchOutcome) -> Self {
        let (outcome, run) = match value {
            DispatchOutcome::Completed(run) => (InvokeOutcomeDto::Completed, run),
            DispatchOutcome::Accepted(run) => (InvokeOutcomeDto::Accepted, run),
            DispatchOutcome::Deduplicated(run) => (InvokeOutcomeDto::Deduplicated, run),
        };

        Self {
            outcome,
            run: run.into(),
        }
    }
}

impl From<ReconcileOutcome> for CallbackResponse {
    fn from(value: ReconcileOutcome) -> Self {
        let (outcome, run) = match value {
            ReconcileOutcome::Applied(run) => (CallbackOutcomeDto::Applied, run),
            ReconcileOutcome::AlreadyTerminal(run) => (CallbackOutcomeDto::AlreadyTerminal, run),
        };

        Self {
            outcome,
            run: run.into(),
        }
    }
}

impl From<CallbackErrorRequest> for CallbackError {
    fn from(value: CallbackErrorRequest) -> Self {
        Self {
            message: value.message,
            code: value.code,
        }
    }
}

impl TryFrom<SaveActionDefinitionRequest> for ActionDefinition {
    type Error = AppError;

    fn try_from(value: SaveActionDefinitionRequest) -> Result<Self, Self::Error> {
        let provider = match value.provider {
            Some(provider) => ProviderAdapter::new(provider)?,
            None => ProviderAdapter::webhook_workflow(),
        };

        ActionDefinition::new(ActionDefinitionInput {
            app_key: value.app_key,
            action_key: value.action_key,
            version: value.version,
            display_name: value.display_name,
            provider,
            enabled: value.enabled,
            input_schema: ActionInputSchema::new(value.input_schema)?,
            output_schema: value.output_schema,
            created_at: Utc::now(),
        })
    }
}

impl From<ActionDefinition> for ActionDefinitionResponse {
    fn from(value: ActionDefinition) -> Self {
        Self {
            app_key: value.app_key().as_str().to_owned(),
            action_key: value.action_key().as_str().to_owned(),
            qualified_name: value.qualified_name(),
            version: value.version(),
            display_name: value.display_name().map(str::to_owned),
            provider: value.provider().to_string(),
            enabled: value.is_enabled(),
            input_schema: value.input_schema().to_json(),
            output_schema: value.output_schema().cloned(),
            created_at: value.created_at().to_rfc3339(),
        }
    }
}

impl From<UsageAuditEntry> for UsageAuditEntryResponse {
    fn from(value: UsageAuditEntry) -> Self {
        Self {
            tenant_id: value.tenant_id.to_string(),
            action_name: value.action_name,
            run_id: value.run_id,
            status: value.status.as_str().to_owned(),
            duration_ms: value.duration_ms,
            error_message: value.error_message,
            request_id: value.request_id,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}
