use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use flowgate_application::{ProviderEndpoint, RateLimitPolicy, RetryPolicy};
use flowgate_core::{AppError, TenantId};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStoreConfig {
    Postgres,
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSinkConfig {
    Store,
    Tracing,
}

/// Webhook endpoint provisioned for one tenant through `WEBHOOK_WORKFLOW_ENDPOINTS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededEndpoint {
    pub tenant_id: TenantId,
    pub endpoint: ProviderEndpoint,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub storage_backend: StorageBackend,
    pub rate_limit_store: RateLimitStoreConfig,
    pub redis_url: Option<String>,
    pub rate_limit_policy: RateLimitPolicy,
    pub retry_policy: RetryPolicy,
    pub provider_http_timeout: Duration,
    pub dispatch_request_timeout: Duration,
    pub idempotency_window: chrono::Duration,
    pub callback_shared_secret: String,
    pub audit_sink: AuditSinkConfig,
    pub registry_admin_role: String,
    pub webhook_endpoints: Vec<SeededEndpoint>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage_backend = match optional("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let database_url = optional("DATABASE_URL");
        if (storage_backend == StorageBackend::Postgres || migrate_only) && database_url.is_none()
        {
            return Err(AppError::Validation("DATABASE_URL is required".to_owned()));
        }

        let rate_limit_store = match optional("RATE_LIMIT_STORE").as_deref() {
            None => match storage_backend {
                StorageBackend::Postgres => RateLimitStoreConfig::Postgres,
                StorageBackend::Memory => RateLimitStoreConfig::Memory,
            },
            Some("postgres") => RateLimitStoreConfig::Postgres,
            Some("redis") => RateLimitStoreConfig::Redis,
            Some("memory") => RateLimitStoreConfig::Memory,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "RATE_LIMIT_STORE must be 'postgres', 'redis' or 'memory', got '{other}'"
                )));
            }
        };
        if rate_limit_store == RateLimitStoreConfig::Postgres
            && storage_backend == StorageBackend::Memory
        {
            return Err(AppError::Validation(
                "RATE_LIMIT_STORE=postgres requires STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        let redis_url = optional("REDIS_URL");
        if rate_limit_store == RateLimitStoreConfig::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when RATE_LIMIT_STORE=redis".to_owned(),
            ));
        }

        let audit_sink = match optional("AUDIT_SINK").as_deref() {
            None | Some("postgres") => AuditSinkConfig::Store,
            Some("tracing") => AuditSinkConfig::Tracing,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "AUDIT_SINK must be either 'postgres' or 'tracing', got '{other}'"
                )));
            }
        };

        let callback_shared_secret = optional("CALLBACK_SHARED_SECRET").ok_or_else(|| {
            AppError::Validation("CALLBACK_SHARED_SECRET is required".to_owned())
        })?;

        // An explicitly empty schedule disables retries.
        let retry_policy = match lookup("DISPATCH_RETRY_BACKOFF_MS") {
            Some(value) => RetryPolicy::parse_millis(value.as_str())?,
            None => RetryPolicy::default(),
        };

        let idempotency_seconds = parse_or(
            &optional,
            "DISPATCH_IDEMPOTENCY_WINDOW_SECONDS",
            86_400_i64,
        )?;
        if idempotency_seconds < 0 {
            return Err(AppError::Validation(
                "DISPATCH_IDEMPOTENCY_WINDOW_SECONDS must not be negative".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            api_host: optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            api_port: parse_or(&optional, "API_PORT", 3001_u16)?,
            storage_backend,
            rate_limit_store,
            redis_url,
            rate_limit_policy: RateLimitPolicy::new(parse_or(
                &optional,
                "DISPATCH_RATE_LIMIT_PER_MINUTE",
                RateLimitPolicy::DEFAULT_LIMIT_PER_MINUTE,
            )?),
            retry_policy,
            provider_http_timeout: Duration::from_millis(parse_or(
                &optional,
                "PROVIDER_HTTP_TIMEOUT_MS",
                10_000_u64,
            )?),
            dispatch_request_timeout: Duration::from_millis(parse_or(
                &optional,
                "DISPATCH_REQUEST_TIMEOUT_MS",
                30_000_u64,
            )?),
            idempotency_window: chrono::Duration::seconds(idempotency_seconds),
            callback_shared_secret,
            audit_sink,
            registry_admin_role: optional("REGISTRY_ADMIN_ROLE")
                .unwrap_or_else(|| "integration_admin".to_owned()),
            webhook_endpoints: optional("WEBHOOK_WORKFLOW_ENDPOINTS")
                .map(|value| parse_webhook_endpoints(value.as_str()))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
}

/// Parses `tenant=url[,token]` entries separated by `;`.
fn parse_webhook_endpoints(value: &str) -> Result<Vec<SeededEndpoint>, AppError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<SeededEndpoint, AppError> {
            let (tenant, target) = entry.split_once('=').ok_or_else(|| {
                AppError::Validation(format!(
                    "WEBHOOK_WORKFLOW_ENDPOINTS entry '{entry}' must look like tenant=url[,token]"
                ))
            })?;
            let (url, bearer_token) = match target.split_once(',') {
                Some((url, token)) => (url, Some(token.trim()).filter(|token| !token.is_empty())),
                None => (target, None),
            };

            let url = Url::parse(url.trim()).map_err(|error| {
                AppError::Validation(format!(
                    "invalid WEBHOOK_WORKFLOW_ENDPOINTS url for tenant '{}': {error}",
                    tenant.trim()
                ))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::Validation(format!(
                    "WEBHOOK_WORKFLOW_ENDPOINTS url '{url}' must use http or https"
                )));
            }

            Ok(SeededEndpoint {
                tenant_id: tenant.parse::<TenantId>()?,
                endpoint: ProviderEndpoint {
                    url,
                    bearer_token: bearer_token.map(str::to_owned),
                },
            })
        })
        .collect()
}

fn parse_or<T>(
    optional: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}
