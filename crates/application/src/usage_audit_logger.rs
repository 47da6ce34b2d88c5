use std::sync::Arc;

use tracing::warn;

use crate::integration_ports::{UsageAuditEntry, UsageAuditSink};

/// Best-effort writer for usage audit entries.
///
/// Sink failures are logged and swallowed; they never change a dispatch outcome.
#[derive(Clone)]
pub struct UsageAuditLogger {
    sink: Arc<dyn UsageAuditSink>,
}

impl UsageAuditLogger {
    /// Creates a logger over the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn UsageAuditSink>) -> Self {
        Self { sink }
    }

    /// Appends one entry.
    pub async fn record(&self, entry: UsageAuditEntry) {
        let tenant_id = entry.tenant_id;
        let action_name = entry.action_name.clone();
        let status = entry.status;

        if let Err(error) = self.sink.append_entry(entry).await {
            warn!(
                tenant_id = %tenant_id,
                action = %action_name,
                status = status.as_str(),
                error = %error,
                "failed to record usage audit entry"
            );
        }
    }
}
