use async_trait::async_trait;
use flowgate_application::{UsageAuditEntry, UsageAuditSink};
use flowgate_core::{AppError, AppResult};

/// Usage audit sink writing one JSON line per entry to the `flowgate::usage_audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageAuditSink;

impl TracingUsageAuditSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UsageAuditSink for TracingUsageAuditSink {
    async fn append_entry(&self, entry: UsageAuditEntry) -> AppResult<()> {
        let line = serde_json::to_string(&entry).map_err(|error| {
            AppError::Internal(format!("failed to serialize usage audit entry: {error}"))
        })?;

        tracing::info!(
            target: "flowgate::usage_audit",
            tenant_id = %entry.tenant_id,
            status = entry.status.as_str(),
            "{line}"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use flowgate_application::{UsageAuditEntry, UsageAuditSink, UsageAuditStatus};
    use flowgate_core::TenantId;

    use super::TracingUsageAuditSink;

    #[tokio::test]
    async fn entries_serialize_and_append() {
        let entry = UsageAuditEntry {
            tenant_id: TenantId::new(),
            action_name: "erp.sync_customers".to_owned(),
            run_id: Some("run-1".to_owned()),
            status: UsageAuditStatus::Failed,
            duration_ms: 40,
            error_message: Some("provider responded with status 500".to_owned()),
            request_id: "r-1".to_owned(),
            created_at: Utc::now(),
        };

        let line = serde_json::to_value(&entry).unwrap_or_default();
        assert_eq!(line["status"], "failed");
        assert_eq!(line["run_id"], "run-1");

        assert!(TracingUsageAuditSink::new().append_entry(entry).await.is_ok());
    }
}
