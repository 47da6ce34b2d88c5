use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};

use flowgate_application::{
    CallbackNotification, DispatchContext, DispatchOutcome, IntegrationRunListQuery,
    UsageAuditQuery, UsageAuditStatus,
};
use flowgate_core::{AppError, CallerIdentity};
use flowgate_domain::{ActionDefinition, IntegrationRunStatus};

use crate::dto::{
    ActionDefinitionResponse, CallbackRequest, CallbackResponse, IntegrationListQueryParams,
    IntegrationRunResponse, InvokeActionRequest, InvokeActionResponse, SaveActionDefinitionRequest,
    UsageAuditEntryResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{CallbackScope, REQUEST_ID_HEADER, header_value};
use crate::state::AppState;

mod actions;
mod callbacks;
mod invoke;
mod runs;
mod usage;

pub use actions::{list_action_definitions_handler, save_action_definition_handler};
pub use callbacks::provider_callback_handler;
pub use invoke::invoke_action_handler;
pub use runs::{get_integration_run_handler, list_integration_runs_handler};
pub use usage::list_usage_handler;

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_run_status(value: Option<String>) -> Result<Option<IntegrationRunStatus>, AppError> {
    non_empty(value)
        .map(|value| IntegrationRunStatus::parse(value.as_str()))
        .transpose()
}

fn parse_usage_status(value: Option<String>) -> Result<Option<UsageAuditStatus>, AppError> {
    non_empty(value)
        .map(|value| UsageAuditStatus::parse(value.as_str()))
        .transpose()
}
