use std::sync::Arc;
use std::time::Duration;

use flowgate_application::{
    ActionRegistry, CallbackReconciler, DispatchService, IntegrationQueryService, RateLimitService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub action_registry: ActionRegistry,
    pub dispatch_service: DispatchService,
    pub callback_reconciler: CallbackReconciler,
    pub query_service: IntegrationQueryService,
    pub rate_limit_service: RateLimitService,
    pub callback_shared_secret: Arc<str>,
    pub dispatch_request_timeout: Duration,
}
