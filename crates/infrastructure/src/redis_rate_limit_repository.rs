//! Redis-backed rate limit repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_application::RateLimitRepository;
use flowgate_core::{AppError, AppResult, TenantId};
use flowgate_domain::{ProviderAdapter, RateLimitDecision, RateLimitWindow};
use redis::Script;

// One key per wall-clock minute; the counter only moves while below the ceiling.
const ADMIT_SCRIPT: &str = r#"
local key = KEYS[1]
local limit = tonumber(ARGV[1])
local ttl = tonumber(ARGV[2])

local current = tonumber(redis.call('GET', key) or '0')
if current >= limit then
  return {0, current}
end

current = redis.call('INCR', key)
redis.call('EXPIRE', key, ttl)
return {1, current}
"#;

const KEY_TTL_SECONDS: i64 = 120;

/// Redis implementation of the rate limit repository port.
#[derive(Clone)]
pub struct RedisRateLimitRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateLimitRepository {
    /// Creates a repository with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        window_start: DateTime<Utc>,
    ) -> String {
        format!(
            "{}:{tenant_id}:{provider}:{}",
            self.key_prefix,
            window_start.timestamp()
        )
    }
}

#[async_trait]
impl RateLimitRepository for RedisRateLimitRepository {
    async fn try_admit(
        &self,
        tenant_id: TenantId,
        provider: &ProviderAdapter,
        limit_per_minute: u32,
        now: DateTime<Utc>,
    ) -> AppResult<RateLimitDecision> {
        let redis_key = self.key_for(tenant_id, provider, RateLimitWindow::minute_start(now));

        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))?;

        let (admitted, count): (i64, i64) = Script::new(ADMIT_SCRIPT)
            .key(redis_key)
            .arg(limit_per_minute)
            .arg(KEY_TTL_SECONDS)
            .invoke_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to run redis rate limit admission for tenant '{tenant_id}': {error}"
                ))
            })?;

        if admitted == 0 {
            return Ok(RateLimitDecision::Limited {
                retry_after_seconds: RateLimitWindow::retry_after_seconds(now),
            });
        }

        let used = u32::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid redis counter: {error}")))?;
        Ok(RateLimitDecision::Allowed {
            remaining: limit_per_minute.saturating_sub(used),
        })
    }

    async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
        // Window keys expire through their TTL.
        Ok(0)
    }
}
