use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::{AppError, AppResult, TenantId};
use serde::Serialize;

/// Outcome recorded for one action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageAuditStatus {
    /// Provider accepted the action for asynchronous completion.
    Accepted,
    /// Action completed successfully.
    Succeeded,
    /// Action failed at the provider or could not be delivered.
    Failed,
    /// Refused by the rate limiter.
    RateLimited,
    /// Refused before dispatch: unknown action or invalid input.
    Rejected,
}

impl UsageAuditStatus {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RateLimited => "rate_limited",
            Self::Rejected => "rejected",
        }
    }

    /// Parses storage value.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "accepted" => Ok(Self::Accepted),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "rate_limited" => Ok(Self::RateLimited),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown usage audit status '{value}'"
            ))),
        }
    }
}

/// Immutable usage audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageAuditEntry {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Qualified action name.
    pub action_name: String,
    /// Ledger run, when one was created.
    pub run_id: Option<String>,
    /// Recorded outcome.
    pub status: UsageAuditStatus,
    /// Elapsed time of the attempt in milliseconds.
    pub duration_ms: u64,
    /// Failure details.
    pub error_message: Option<String>,
    /// Caller correlation id.
    pub request_id: String,
    /// Record timestamp.
    pub created_at: DateTime<Utc>,
}

/// Usage audit listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageAuditQuery {
    /// Optional qualified action name filter.
    pub action_name: Option<String>,
    /// Optional status filter.
    pub status: Option<UsageAuditStatus>,
    /// Page size.
    pub limit: usize,
    /// Row offset.
    pub offset: usize,
}

/// Append-only destination for usage audit entries.
#[async_trait]
pub trait UsageAuditSink: Send + Sync {
    /// Appends one entry.
    async fn append_entry(&self, entry: UsageAuditEntry) -> AppResult<()>;
}

/// Read model over stored usage audit entries.
#[async_trait]
pub trait UsageAuditReader: Send + Sync {
    /// Lists entries for a tenant, newest first.
    async fn list_entries(
        &self,
        tenant_id: TenantId,
        query: UsageAuditQuery,
    ) -> AppResult<Vec<UsageAuditEntry>>;
}
