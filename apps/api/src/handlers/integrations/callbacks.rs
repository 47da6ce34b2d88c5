use super::*;

pub async fn provider_callback_handler(
    State(state): State<AppState>,
    Extension(CallbackScope(tenant_scope)): Extension<CallbackScope>,
    Json(payload): Json<CallbackRequest>,
) -> ApiResult<Json<CallbackResponse>> {
    let outcome = state
        .callback_reconciler
        .reconcile(CallbackNotification {
            tenant_scope,
            run_id: non_empty(payload.run_id),
            request_id: non_empty(payload.request_id),
            status: payload.status,
            external_run_id: non_empty(payload.external_run_id),
            result: payload.result,
            error: payload.error.map(Into::into),
        })
        .await?;

    Ok(Json(outcome.into()))
}
