mod common;
mod integrations;

pub use common::HealthResponse;
pub use integrations::{
    ActionDefinitionResponse, CallbackErrorRequest, CallbackOutcomeDto, CallbackRequest,
    CallbackResponse, IntegrationListQueryParams, IntegrationRunResponse, InvokeActionRequest,
    InvokeActionResponse, InvokeOutcomeDto, SaveActionDefinitionRequest, UsageAuditEntryResponse,
};
