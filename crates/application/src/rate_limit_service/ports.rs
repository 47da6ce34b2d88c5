use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::{AppResult, TenantId};
use flowgate_domain::{ProviderAdapter, RateLimitDecision};

/// Repository port for rate limit window persistence.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Runs one admission check as a single atomic read-modify-write.
    ///
    /// Resets the stored window when `now` falls in another minute, then increments only
    /// if the counter is below `limit_per_minute`.
    async fn try_admit(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        limit_per_minute: u32,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision>;

    /// Removes windows that started before the given cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
