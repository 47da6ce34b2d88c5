use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let caller_routes = Router::new()
        .route(
            "/api/integrations/actions",
            get(handlers::integrations::list_action_definitions_handler)
                .put(handlers::integrations::save_action_definition_handler),
        )
        .route(
            "/api/integrations/actions/{app_key}/{action_key}/invoke",
            post(handlers::integrations::invoke_action_handler),
        )
        .route(
            "/api/integrations/runs",
            get(handlers::integrations::list_integration_runs_handler),
        )
        .route(
            "/api/integrations/runs/{run_id}",
            get(handlers::integrations::get_integration_run_handler),
        )
        .route(
            "/api/integrations/usage",
            get(handlers::integrations::list_usage_handler),
        )
        .route_layer(from_fn(middleware::require_caller));

    let callback_routes = Router::new()
        .route(
            "/api/integrations/callbacks",
            post(handlers::integrations::provider_callback_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_callback_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(caller_routes)
        .merge(callback_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
