use std::collections::BTreeMap;

use flowgate_domain::FieldRequirement;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Incoming payload for one action invocation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invoke-action-request.ts"
)]
pub struct InvokeActionRequest {
    pub version: Option<u32>,
    #[ts(type = "Record<string, unknown>")]
    pub input: Value,
    pub request_id: Option<String>,
    pub idempotency_key: Option<String>,
}

/// How an invocation reached the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invoke-outcome-dto.ts"
)]
pub enum InvokeOutcomeDto {
    Completed,
    Accepted,
    Deduplicated,
}

/// Invocation response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invoke-action-response.ts"
)]
pub struct InvokeActionResponse {
    pub outcome: InvokeOutcomeDto,
    pub run: IntegrationRunResponse,
}

/// API representation of one ledger run.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/integration-run-response.ts"
)]
pub struct IntegrationRunResponse {
    pub run_id: String,
    pub tenant_id: String,
    pub provider: String,
    pub action_name: String,
    pub action_version: u32,
    pub request_id: String,
    pub idempotency_key: Option<String>,
    pub status: String,
    pub http_status: Option<u16>,
    pub attempts: u32,
    pub started_at: String,
    pub finished_at: Option<String>,
    #[ts(type = "unknown | null")]
    pub response_payload: Option<Value>,
    pub error_message: Option<String>,
    pub external_run_id: Option<String>,
}

/// Incoming payload for action definition create/update.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/save-action-definition-request.ts"
)]
pub struct SaveActionDefinitionRequest {
    pub app_key: String,
    pub action_key: String,
    pub version: u32,
    pub display_name: Option<String>,
    pub provider: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[ts(type = "Record<string, \"required\" | \"optional\">")]
    pub input_schema: BTreeMap<String, FieldRequirement>,
    #[ts(type = "unknown | null")]
    pub output_schema: Option<Value>,
}

fn default_enabled() -> bool {
    true
}

/// API representation of an action definition.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/action-definition-response.ts"
)]
pub struct ActionDefinitionResponse {
    pub app_key: String,
    pub action_key: String,
    pub qualified_name: String,
    pub version: u32,
    pub display_name: Option<String>,
    pub provider: String,
    pub enabled: bool,
    #[ts(type = "Record<string, \"required\" | \"optional\">")]
    pub input_schema: Value,
    #[ts(type = "unknown | null")]
    pub output_schema: Option<Value>,
    pub created_at: String,
}

/// Paging and filter parameters shared by run and usage listings.
#[derive(Debug, Default, Deserialize)]
pub struct IntegrationListQueryParams {
    pub action_name: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// API representation of a usage audit entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/usage-audit-entry-response.ts"
)]
pub struct UsageAuditEntryResponse {
    pub tenant_id: String,
    pub action_name: String,
    pub run_id: Option<String>,
    pub status: String,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub request_id: String,
    pub created_at: String,
}

/// Provider-reported failure details.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/callback-error-request.ts"
)]
pub struct CallbackErrorRequest {
    pub message: String,
    pub code: Option<String>,
}

/// Incoming provider completion notification.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/callback-request.ts"
)]
pub struct CallbackRequest {
    pub run_id: Option<String>,
    pub request_id: Option<String>,
    pub status: String,
    pub external_run_id: Option<String>,
    #[ts(type = "unknown | null")]
    pub result: Option<Value>,
    pub error: Option<CallbackErrorRequest>,
}

/// How a callback was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/callback-outcome-dto.ts"
)]
pub enum CallbackOutcomeDto {
    Applied,
    AlreadyTerminal,
}

/// Callback response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/callback-response.ts"
)]
pub struct CallbackResponse {
    pub outcome: CallbackOutcomeDto,
    pub run: IntegrationRunResponse,
}
