mod conversions;
mod types;

pub use types::{
    ActionDefinitionResponse, CallbackErrorRequest, CallbackOutcomeDto, CallbackRequest,
    CallbackResponse, IntegrationListQueryParams, IntegrationRunResponse, InvokeActionRequest,
    InvokeActionResponse, InvokeOutcomeDto, SaveActionDefinitionRequest, UsageAuditEntryResponse,
};
