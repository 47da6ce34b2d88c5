use std::time::Duration;

use async_trait::async_trait;
use flowgate_application::{
    ProviderCallResult, ProviderClient, ProviderEndpoint, ProviderInvocation,
};
use flowgate_core::{AppError, AppResult};

/// HTTP webhook client for provider dispatch.
///
/// Performs exactly one request per call. Retrying is the dispatcher's job.
#[derive(Clone)]
pub struct HttpProviderClient {
    http_client: reqwest::Client,
}

impl HttpProviderClient {
    /// Creates a client over an existing reqwest client.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Creates a client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                AppError::Internal(format!("failed to build provider http client: {error}"))
            })?;

        Ok(Self::new(http_client))
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn invoke(
        &self,
        endpoint: &ProviderEndpoint,
        invocation: &ProviderInvocation,
    ) -> ProviderCallResult {
        let mut builder = self
            .http_client
            .post(endpoint.url.clone())
            .header("X-Tenant-Id", invocation.tenant_id.to_string())
            .header("X-Request-Id", invocation.request_id.as_str())
            .header("X-Run-Id", invocation.run_id.as_str())
            .json(&invocation.body);

        if let Some(idempotency_key) = invocation.idempotency_key.as_deref() {
            builder = builder.header("Idempotency-Key", idempotency_key);
        }
        if let Some(token) = endpoint.bearer_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => {
                return ProviderCallResult::Unreachable {
                    message: format!("provider transport error: {error}"),
                };
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => ProviderCallResult::Responded { status, body },
            Err(error) => ProviderCallResult::Unreachable {
                message: format!("provider response body interrupted after status {status}: {error}"),
            },
        }
    }
}
