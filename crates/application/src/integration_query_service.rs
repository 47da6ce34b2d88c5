use std::sync::Arc;

use flowgate_core::{AppError, AppResult, CallerIdentity};

use crate::integration_ports::{
    IntegrationRun, IntegrationRunListQuery, IntegrationRunRepository, UsageAuditEntry,
    UsageAuditQuery, UsageAuditReader,
};

/// Page size used when a listing does not name one.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: usize = 200;

/// Read model over the run ledger and usage audit log, scoped to the caller's tenant.
#[derive(Clone)]
pub struct IntegrationQueryService {
    run_repository: Arc<dyn IntegrationRunRepository>,
    usage_reader: Arc<dyn UsageAuditReader>,
}

impl IntegrationQueryService {
    /// Creates a query service.
    #[must_use]
    pub fn new(
        run_repository: Arc<dyn IntegrationRunRepository>,
        usage_reader: Arc<dyn UsageAuditReader>,
    ) -> Self {
        Self {
            run_repository,
            usage_reader,
        }
    }

    /// Lists runs for the caller's tenant, newest first.
    pub async fn list_runs(
        &self,
        caller: &CallerIdentity,
        query: IntegrationRunListQuery,
    ) -> AppResult<Vec<IntegrationRun>> {
        let query = IntegrationRunListQuery {
            limit: page_size(query.limit)?,
            ..query
        };
        self.run_repository
            .list_runs(caller.tenant_id(), query)
            .await
    }

    /// Returns one run of the caller's tenant.
    pub async fn get_run(
        &self,
        caller: &CallerIdentity,
        run_id: &str,
    ) -> AppResult<IntegrationRun> {
        self.run_repository
            .find_run(Some(caller.tenant_id()), run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("integration run '{run_id}' not found")))
    }

    /// Lists usage audit entries for the caller's tenant, newest first.
    pub async fn list_usage(
        &self,
        caller: &CallerIdentity,
        query: UsageAuditQuery,
    ) -> AppResult<Vec<UsageAuditEntry>> {
        let query = UsageAuditQuery {
            limit: page_size(query.limit)?,
            ..query
        };
        self.usage_reader
            .list_entries(caller.tenant_id(), query)
            .await
    }
}

fn page_size(limit: usize) -> AppResult<usize> {
    match limit {
        0 => Ok(DEFAULT_PAGE_SIZE),
        limit if limit <= MAX_PAGE_SIZE => Ok(limit),
        limit => Err(AppError::Validation(format!(
            "limit must be at most {MAX_PAGE_SIZE}, got {limit}"
        ))),
    }
}
