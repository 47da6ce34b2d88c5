//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod integration_run;
mod provider;
mod rate_limit;

pub use action::{ActionDefinition, ActionDefinitionInput, ActionInputSchema, FieldRequirement};
pub use integration_run::{IntegrationRunStatus, RunTransition, RunTransitionRejection};
pub use provider::ProviderAdapter;
pub use rate_limit::{RateLimitDecision, RateLimitWindow};
