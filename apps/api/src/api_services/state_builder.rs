use std::sync::Arc;

use flowgate_application::{
    ActionDefinitionRepository, ActionRegistry, CallbackReconciler, DispatchService,
    DispatchSettings, IntegrationQueryService, IntegrationRunRepository, ProviderEndpointResolver,
    ProviderRegistry, RateLimitRepository, RateLimitService, UsageAuditLogger, UsageAuditReader,
    UsageAuditSink,
};
use flowgate_core::{AppError, AppResult};
use flowgate_domain::ProviderAdapter;
use flowgate_infrastructure::{
    HttpProviderClient, InMemoryActionDefinitionRepository, InMemoryIntegrationRunRepository,
    InMemoryProviderEndpointResolver, InMemoryRateLimitRepository, InMemoryUsageAuditLog,
    PostgresActionDefinitionRepository, PostgresIntegrationRunRepository,
    PostgresProviderEndpointResolver, PostgresRateLimitRepository, PostgresUsageAuditRepository,
    RedisRateLimitRepository, TracingUsageAuditSink,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, AuditSinkConfig, RateLimitStoreConfig, StorageBackend};
use crate::state::AppState;

use super::redis::build_redis_client;

/// Port implementations selected by configuration.
pub struct StorageAdapters {
    pub action_definitions: Arc<dyn ActionDefinitionRepository>,
    pub runs: Arc<dyn IntegrationRunRepository>,
    pub rate_limits: Arc<dyn RateLimitRepository>,
    pub endpoints: Arc<dyn ProviderEndpointResolver>,
    pub usage_sink: Arc<dyn UsageAuditSink>,
    pub usage_reader: Arc<dyn UsageAuditReader>,
}

pub fn build_storage_adapters(
    pool: Option<PgPool>,
    config: &ApiConfig,
) -> AppResult<StorageAdapters> {
    let mut adapters = match (config.storage_backend, pool.clone()) {
        (StorageBackend::Postgres, Some(pool)) => {
            let usage_log = Arc::new(PostgresUsageAuditRepository::new(pool.clone()));
            StorageAdapters {
                action_definitions: Arc::new(PostgresActionDefinitionRepository::new(
                    pool.clone(),
                )),
                runs: Arc::new(PostgresIntegrationRunRepository::new(pool.clone())),
                rate_limits: Arc::new(PostgresRateLimitRepository::new(pool.clone())),
                endpoints: Arc::new(PostgresProviderEndpointResolver::new(pool)),
                usage_sink: usage_log.clone(),
                usage_reader: usage_log,
            }
        }
        (StorageBackend::Postgres, None) => {
            return Err(AppError::Validation(
                "STORAGE_BACKEND=postgres requires a database connection".to_owned(),
            ));
        }
        (StorageBackend::Memory, _) => {
            let usage_log = Arc::new(InMemoryUsageAuditLog::new());
            StorageAdapters {
                action_definitions: Arc::new(InMemoryActionDefinitionRepository::new()),
                runs: Arc::new(InMemoryIntegrationRunRepository::new()),
                rate_limits: Arc::new(InMemoryRateLimitRepository::new()),
                endpoints: Arc::new(InMemoryProviderEndpointResolver::with_endpoints(
                    config.webhook_endpoints.iter().map(|seeded| {
                        (
                            seeded.tenant_id,
                            ProviderAdapter::webhook_workflow(),
                            seeded.endpoint.clone(),
                        )
                    }),
                )),
                usage_sink: usage_log.clone(),
                usage_reader: usage_log,
            }
        }
    };

    adapters.rate_limits = match config.rate_limit_store {
        RateLimitStoreConfig::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Validation(
                    "RATE_LIMIT_STORE=postgres requires a database connection".to_owned(),
                )
            })?;
            Arc::new(PostgresRateLimitRepository::new(pool))
        }
        RateLimitStoreConfig::Redis => {
            let redis_url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned())
            })?;
            Arc::new(RedisRateLimitRepository::new(
                build_redis_client(redis_url)?,
                "flowgate:rate_limit",
            ))
        }
        RateLimitStoreConfig::Memory => Arc::new(InMemoryRateLimitRepository::new()),
    };

    if config.audit_sink == AuditSinkConfig::Tracing {
        adapters.usage_sink = Arc::new(TracingUsageAuditSink::new());
    }

    Ok(adapters)
}

pub fn build_provider_registry(config: &ApiConfig) -> AppResult<ProviderRegistry> {
    let webhook_client = HttpProviderClient::with_timeout(config.provider_http_timeout)?;
    Ok(ProviderRegistry::new().with_client(
        ProviderAdapter::webhook_workflow(),
        Arc::new(webhook_client),
    ))
}

pub fn build_app_state(
    adapters: StorageAdapters,
    providers: ProviderRegistry,
    config: &ApiConfig,
) -> AppState {
    let audit_logger = UsageAuditLogger::new(adapters.usage_sink);
    let action_registry = ActionRegistry::new(
        adapters.action_definitions,
        config.registry_admin_role.clone(),
    );
    let rate_limit_service = RateLimitService::new(adapters.rate_limits, config.rate_limit_policy);

    let dispatch_service = DispatchService::new(
        action_registry.clone(),
        rate_limit_service.clone(),
        adapters.runs.clone(),
        adapters.endpoints,
        providers,
        audit_logger.clone(),
    )
    .with_settings(DispatchSettings {
        retry_policy: config.retry_policy.clone(),
        idempotency_window: config.idempotency_window,
    });

    AppState {
        action_registry,
        dispatch_service,
        callback_reconciler: CallbackReconciler::new(adapters.runs.clone(), audit_logger),
        query_service: IntegrationQueryService::new(adapters.runs, adapters.usage_reader),
        rate_limit_service,
        callback_shared_secret: Arc::from(config.callback_shared_secret.as_str()),
        dispatch_request_timeout: config.dispatch_request_timeout,
    }
}
