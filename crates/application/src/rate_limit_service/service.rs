use std::sync::Arc;

use chrono::Utc;
use flowgate_core::{AppResult, TenantId};
use flowgate_domain::{ProviderAdapter, RateLimitDecision};

use super::config::RateLimitPolicy;
use super::ports::RateLimitRepository;

/// Application service for provider rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
    policy: RateLimitPolicy,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>, policy: RateLimitPolicy) -> Self {
        Self { repository, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Admits or refuses one dispatch for the tenant and provider.
    ///
    /// A refused request is not counted against the window.
    pub async fn admit(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
    ) -> AppResult<RateLimitDecision> {
        self.repository
            .try_admit(tenant_id, provider, self.policy.limit_per_minute, Utc::now())
            .await
    }

    /// Removes stale windows. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(1);
        self.repository.cleanup_expired(cutoff).await
    }
}
