use super::*;

pub async fn invoke_action_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((app_key, action_key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<InvokeActionRequest>,
) -> ApiResult<(StatusCode, Json<InvokeActionResponse>)> {
    let request_id = non_empty(payload.request_id)
        .or_else(|| header_value(&headers, REQUEST_ID_HEADER).map(str::to_owned))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let idempotency_key = non_empty(payload.idempotency_key)
        .or_else(|| header_value(&headers, IDEMPOTENCY_KEY_HEADER).map(str::to_owned));

    let context = DispatchContext {
        caller,
        request_id,
        idempotency_key,
    };

    // Dropping the dispatch future on timeout leaves an unfinished run `started`.
    let outcome = tokio::time::timeout(
        state.dispatch_request_timeout,
        state.dispatch_service.invoke_action(
            &context,
            app_key.as_str(),
            action_key.as_str(),
            payload.version,
            payload.input,
        ),
    )
    .await
    .map_err(|_| {
        ApiError::Timeout(format!(
            "dispatch of '{app_key}.{action_key}' (request '{}') did not finish within {}ms",
            context.request_id,
            state.dispatch_request_timeout.as_millis()
        ))
    })??;

    let status = match outcome {
        DispatchOutcome::Accepted(_) => StatusCode::ACCEPTED,
        DispatchOutcome::Completed(_) | DispatchOutcome::Deduplicated(_) => StatusCode::OK,
    };

    Ok((status, Json(outcome.into())))
}
