use async_trait::async_trait;
use flowgate_core::{AppResult, TenantId};
use flowgate_domain::ProviderAdapter;
use serde_json::Value;
use url::Url;

/// Tenant-configured provider endpoint and credential.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    /// Webhook URL receiving dispatch requests.
    pub url: Url,
    /// Optional bearer credential resolved from the secret store.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProviderEndpoint")
            .field("url", &self.url.as_str())
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Port resolving where and how a tenant's provider is called.
#[async_trait]
pub trait ProviderEndpointResolver: Send + Sync {
    /// Returns the endpoint configured for the tenant and adapter, if any.
    async fn resolve_endpoint(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
    ) -> AppResult<Option<ProviderEndpoint>>;
}

/// One outbound provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInvocation {
    /// Ledger run identifier, sent as `X-Run-Id`.
    pub run_id: String,
    /// Tenant scope, sent as `X-Tenant-Id`.
    pub tenant_id: TenantId,
    /// Caller correlation id, sent as `X-Request-Id`.
    pub request_id: String,
    /// Optional idempotency key, sent as `Idempotency-Key`.
    pub idempotency_key: Option<String>,
    /// JSON request envelope.
    pub body: Value,
}

/// Result of one provider call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCallResult {
    /// Provider returned an HTTP response.
    Responded {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },
    /// Network-level failure: connection refused, timeout, DNS.
    Unreachable {
        /// Transport error description.
        message: String,
    },
}

/// Port performing outbound calls for one provider adapter.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Sends one invocation without retrying.
    async fn invoke(
        &self,
        endpoint: &ProviderEndpoint,
        invocation: &ProviderInvocation,
    ) -> ProviderCallResult;
}
