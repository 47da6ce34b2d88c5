//! Application services and ports.

#![forbid(unsafe_code)]

mod action_registry;
mod callback_reconciler;
mod dispatch_service;
mod integration_ports;
mod integration_query_service;
mod provider_registry;
mod rate_limit_service;
mod usage_audit_logger;

#[cfg(test)]
mod test_support;

pub use action_registry::ActionRegistry;
pub use callback_reconciler::{
    CallbackError, CallbackNotification, CallbackReconciler, ReconcileOutcome,
};
pub use dispatch_service::{
    DispatchContext, DispatchOutcome, DispatchService, DispatchSettings, RetryPolicy,
};
pub use integration_ports::{
    ActionDefinitionRepository, CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun,
    IntegrationRunListQuery, IntegrationRunRepository, ProviderCallResult, ProviderClient,
    ProviderEndpoint, ProviderEndpointResolver, ProviderInvocation, RunTransitionOutcome,
    RunUpdate, UsageAuditEntry, UsageAuditQuery, UsageAuditReader, UsageAuditSink,
    UsageAuditStatus,
};
pub use integration_query_service::{DEFAULT_PAGE_SIZE, IntegrationQueryService, MAX_PAGE_SIZE};
pub use provider_registry::ProviderRegistry;
pub use rate_limit_service::{RateLimitPolicy, RateLimitRepository, RateLimitService};
pub use usage_audit_logger::UsageAuditLogger;
