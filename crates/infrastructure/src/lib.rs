//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_provider_client;
mod in_memory_integration_store;
mod postgres_action_definition_repository;
mod postgres_integration_run_repository;
mod postgres_provider_endpoint_resolver;
mod postgres_rate_limit_repository;
mod postgres_usage_audit_repository;
mod redis_rate_limit_repository;
mod tracing_usage_audit_sink;

#[cfg(test)]
mod postgres_test_support;

pub use http_provider_client::HttpProviderClient;
pub use in_memory_integration_store::{
    InMemoryActionDefinitionRepository, InMemoryIntegrationRunRepository,
    InMemoryProviderEndpointResolver, InMemoryRateLimitRepository, InMemoryUsageAuditLog,
};
pub use postgres_action_definition_repository::PostgresActionDefinitionRepository;
pub use postgres_integration_run_repository::PostgresIntegrationRunRepository;
pub use postgres_provider_endpoint_resolver::PostgresProviderEndpointResolver;
pub use postgres_rate_limit_repository::PostgresRateLimitRepository;
pub use postgres_usage_audit_repository::PostgresUsageAuditRepository;
pub use redis_rate_limit_repository::RedisRateLimitRepository;
pub use tracing_usage_audit_sink::TracingUsageAuditSink;
