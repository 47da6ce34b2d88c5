use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use flowgate_application::{
    ActionDefinitionRepository, CreateIntegrationRunInput, CreateRunOutcome,
    IntegrationRunListQuery, IntegrationRunRepository, ProviderEndpoint, ProviderEndpointResolver,
    RateLimitRepository, RunTransitionOutcome, RunUpdate, UsageAuditEntry, UsageAuditQuery,
    UsageAuditReader, UsageAuditSink, UsageAuditStatus,
};
use flowgate_core::{AppError, TenantId};
use flowgate_domain::{
    ActionDefinition, ActionDefinitionInput, ActionInputSchema, FieldRequirement,
    IntegrationRunStatus, ProviderAdapter, RateLimitDecision, RunTransition,
};
use url::Url;

use super::{
    InMemoryActionDefinitionRepository, InMemoryIntegrationRunRepository,
    InMemoryProviderEndpointResolver, InMemoryRateLimitRepository, InMemoryUsageAuditLog,
    newest_first,
};

fn definition(version: u32, enabled: bool, age_minutes: i64) -> ActionDefinition {
    let schema = ActionInputSchema::new(BTreeMap::from([(
        "customer_id".to_owned(),
        FieldRequirement::Required,
    )]))
    .unwrap_or_else(|_| unreachable!());

    ActionDefinition::new(ActionDefinitionInput {
        app_key: "erp".to_owned(),
        action_key: "sync_customers".to_owned(),
        version,
        display_name: None,
        provider: ProviderAdapter::webhook_workflow(),
        enabled,
        input_schema: schema,
        output_schema: None,
        created_at: Utc::now() - Duration::minutes(age_minutes),
    })
    .unwrap_or_else(|_| unreachable!())
}

fn create_input(request_id: &str, idempotency_key: Option<&str>) -> CreateIntegrationRunInput {
    CreateIntegrationRunInput {
        provider: ProviderAdapter::webhook_workflow(),
        action_name: "erp.sync_customers".to_owned(),
        action_version: 1,
        request_id: request_id.to_owned(),
        idempotency_key: idempotency_key.map(str::to_owned),
        reuse_finished_since: Utc::now() - Duration::hours(24),
    }
}

fn created_run_id(outcome: CreateRunOutcome) -> String {
    match outcome {
        CreateRunOutcome::Created(run) => run.run_id,
        CreateRunOutcome::Existing(_) => panic!("expected a new run"),
    }
}

#[tokio::test]
async fn latest_enabled_definition_skips_disabled_versions() {
    let repository = InMemoryActionDefinitionRepository::new();
    let tenant_id = TenantId::new();
    for stored in [definition(1, true, 30), definition(2, true, 20), definition(3, false, 10)] {
        assert!(repository.save_definition(tenant_id, stored).await.is_ok());
    }

    let latest = repository
        .find_latest_enabled_definition(tenant_id, "erp", "sync_customers")
        .await;
    assert!(matches!(latest, Ok(Some(found)) if found.version() == 2));

    let other_tenant = repository
        .find_latest_enabled_definition(TenantId::new(), "erp", "sync_customers")
        .await;
    assert!(matches!(other_tenant, Ok(None)));

    let versions: Vec<u32> = repository
        .list_definitions(tenant_id)
        .await
        .unwrap_or_default()
        .iter()
        .map(ActionDefinition::version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn resaving_a_version_keeps_its_creation_time() {
    let repository = InMemoryActionDefinitionRepository::new();
    let tenant_id = TenantId::new();
    let original = definition(1, true, 120);
    let original_created = original.created_at();
    for stored in [original, definition(2, true, 60)] {
        assert!(repository.save_definition(tenant_id, stored).await.is_ok());
    }

    let resaved = repository
        .save_definition(tenant_id, definition(1, false, 0))
        .await;
    assert!(
        matches!(resaved, Ok(found) if found.created_at() == original_created && !found.is_enabled())
    );

    assert!(
        repository
            .save_definition(tenant_id, definition(1, true, 0))
            .await
            .is_ok()
    );
    let latest = repository
        .find_latest_enabled_definition(tenant_id, "erp", "sync_customers")
        .await
        .unwrap_or_default()
        .map(|found| found.version());
    assert_eq!(latest, Some(2));
}

#[tokio::test]
async fn concurrent_creates_with_one_key_share_a_run() {
    let repository = Arc::new(InMemoryIntegrationRunRepository::new());
    let tenant_id = TenantId::new();

    let first = {
        let repository = repository.clone();
        tokio::spawn(async move {
            repository
                .create_run(tenant_id, create_input("r-1", Some("sync-1")))
                .await
        })
    };
    let second = {
        let repository = repository.clone();
        tokio::spawn(async move {
            repository
                .create_run(tenant_id, create_input("r-2", Some("sync-1")))
                .await
        })
    };

    let outcomes = [first.await, second.await];
    let created = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Ok(Ok(CreateRunOutcome::Created(_)))))
        .count();
    assert_eq!(created, 1);

    let listed = repository
        .list_runs(
            tenant_id,
            IntegrationRunListQuery {
                action_name: None,
                status: None,
                limit: 10,
                offset: 0,
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn runs_sharing_a_start_time_sort_by_run_id() {
    let repository = InMemoryIntegrationRunRepository::new();
    let tenant_id = TenantId::new();
    let mut runs = Vec::new();
    for request_id in ["r-1", "r-1", "r-1"] {
        if let Ok(CreateRunOutcome::Created(run)) =
            repository.create_run(tenant_id, create_input(request_id, None)).await
        {
            runs.push(run);
        }
    }
    assert_eq!(runs.len(), 3);
    let started_at = runs[0].started_at;
    for run in &mut runs {
        run.started_at = started_at;
    }

    let mut expected: Vec<String> = runs.iter().map(|run| run.run_id.clone()).collect();
    expected.sort_by(|left, right| right.cmp(left));

    newest_first(&mut runs);
    let sorted: Vec<String> = runs.iter().map(|run| run.run_id.clone()).collect();
    assert_eq!(sorted, expected);

    runs.reverse();
    newest_first(&mut runs);
    let resorted: Vec<String> = runs.iter().map(|run| run.run_id.clone()).collect();
    assert_eq!(resorted, expected);
}

#[tokio::test]
async fn terminal_runs_reject_further_updates() {
    let repository = InMemoryIntegrationRunRepository::new();
    let tenant_id = TenantId::new();
    let run_id = created_run_id(
        repository
            .create_run(tenant_id, create_input("r-1", None))
            .await
            .unwrap_or_else(|_| unreachable!()),
    );

    let mut accepted = RunUpdate::new(RunTransition::ProviderAccepted);
    accepted.http_status = Some(202);
    accepted.attempts = Some(1);
    let accepted = repository.apply_update(tenant_id, &run_id, accepted).await;
    assert!(matches!(
        accepted,
        Ok(RunTransitionOutcome::Applied(run))
            if run.status == IntegrationRunStatus::InProgress && run.finished_at.is_none()
    ));

    let completed = repository
        .apply_update(
            tenant_id,
            &run_id,
            RunUpdate::new(RunTransition::CallbackSucceeded),
        )
        .await;
    assert!(matches!(
        completed,
        Ok(RunTransitionOutcome::Applied(run))
            if run.status == IntegrationRunStatus::Succeeded
                && run.http_status == Some(202)
                && run.finished_at.is_some()
    ));

    let late = repository
        .apply_update(tenant_id, &run_id, RunUpdate::new(RunTransition::CallbackFailed))
        .await;
    assert!(matches!(
        late,
        Ok(RunTransitionOutcome::Rejected(run)) if run.status == IntegrationRunStatus::Succeeded
    ));
}

#[tokio::test]
async fn updates_are_tenant_scoped() {
    let repository = InMemoryIntegrationRunRepository::new();
    let tenant_id = TenantId::new();
    let run_id = created_run_id(
        repository
            .create_run(tenant_id, create_input("r-1", None))
            .await
            .unwrap_or_else(|_| unreachable!()),
    );

    let foreign = repository
        .apply_update(
            TenantId::new(),
            &run_id,
            RunUpdate::new(RunTransition::CallbackSucceeded),
        )
        .await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    let unscoped = repository.find_run(None, &run_id).await;
    assert!(matches!(unscoped, Ok(Some(run)) if run.tenant_id == tenant_id));
}

#[tokio::test]
async fn rate_limit_counts_per_window() {
    let repository = InMemoryRateLimitRepository::new();
    let tenant_id = TenantId::new();
    let provider = ProviderAdapter::webhook_workflow();
    let now = Utc::now();

    assert!(matches!(
        repository.try_admit(tenant_id, &provider, 1, now).await,
        Ok(RateLimitDecision::Allowed { remaining: 0 })
    ));
    assert!(matches!(
        repository.try_admit(tenant_id, &provider, 1, now).await,
        Ok(RateLimitDecision::Limited { .. })
    ));

    let removed = repository
        .cleanup_expired(now + Duration::minutes(5))
        .await
        .unwrap_or_default();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn registered_endpoints_resolve_per_tenant() {
    let resolver = InMemoryProviderEndpointResolver::new();
    let tenant_id = TenantId::new();
    let endpoint = ProviderEndpoint {
        url: Url::parse("https://provider.test/hooks").unwrap_or_else(|_| unreachable!()),
        bearer_token: None,
    };
    resolver
        .register(tenant_id, ProviderAdapter::webhook_workflow(), endpoint.clone())
        .await;

    let provider = ProviderAdapter::webhook_workflow();
    assert!(matches!(
        resolver.resolve_endpoint(tenant_id, &provider).await,
        Ok(Some(found)) if found == endpoint
    ));
    assert!(matches!(
        resolver.resolve_endpoint(TenantId::new(), &provider).await,
        Ok(None)
    ));
}

#[tokio::test]
async fn seeded_endpoints_resolve_without_registration() {
    let tenant_id = TenantId::new();
    let endpoint = ProviderEndpoint {
        url: Url::parse("https://provider.test/hooks").unwrap_or_else(|_| unreachable!()),
        bearer_token: Some("token-1".to_owned()),
    };
    let resolver = InMemoryProviderEndpointResolver::with_endpoints([(
        tenant_id,
        ProviderAdapter::webhook_workflow(),
        endpoint.clone(),
    )]);

    assert!(matches!(
        resolver
            .resolve_endpoint(tenant_id, &ProviderAdapter::webhook_workflow())
            .await,
        Ok(Some(found)) if found == endpoint
    ));
}

#[tokio::test]
async fn usage_log_lists_newest_first() {
    let log = InMemoryUsageAuditLog::new();
    let tenant_id = TenantId::new();
    for (request_id, status) in [
        ("r-1", UsageAuditStatus::Succeeded),
        ("r-2", UsageAuditStatus::RateLimited),
        ("r-3", UsageAuditStatus::Succeeded),
    ] {
        let entry = UsageAuditEntry {
            tenant_id,
            action_name: "erp.sync_customers".to_owned(),
            run_id: None,
            status,
            duration_ms: 1,
            error_message: None,
            request_id: request_id.to_owned(),
            created_at: Utc::now(),
        };
        assert!(log.append_entry(entry).await.is_ok());
    }

    let listed = log
        .list_entries(
            tenant_id,
            UsageAuditQuery {
                action_name: None,
                status: Some(UsageAuditStatus::Succeeded),
                limit: 10,
                offset: 0,
            },
        )
        .await
        .unwrap_or_default();
    let request_ids: Vec<&str> = listed.iter().map(|entry| entry.request_id.as_str()).collect();
    assert_eq!(request_ids, vec!["r-3", "r-1"]);
}
