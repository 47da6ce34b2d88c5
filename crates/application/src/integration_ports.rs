mod action_definitions;
mod provider;
mod run_ledger;
mod usage_audit;

pub use action_definitions::ActionDefinitionRepository;
pub use provider::{
    ProviderCallResult, ProviderClient, ProviderEndpoint, ProviderEndpointResolver,
    ProviderInvocation,
};
pub use run_ledger::{
    CreateIntegrationRunInput, CreateRunOutcome, IntegrationRun, IntegrationRunListQuery,
    IntegrationRunRepository, RunTransitionOutcome, RunUpdate,
};
pub use usage_audit::{
    UsageAuditEntry, UsageAuditQuery, UsageAuditReader, UsageAuditSink, UsageAuditStatus,
};
