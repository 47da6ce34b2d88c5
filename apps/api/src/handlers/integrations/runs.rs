use super::*;

pub async fn list_integration_runs_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<IntegrationListQueryParams>,
) -> ApiResult<Json<Vec<IntegrationRunResponse>>> {
    let runs = state
        .query_service
        .list_runs(
            &caller,
            IntegrationRunListQuery {
                action_name: non_empty(query.action_name),
                status: parse_run_status(query.status)?,
                limit: query.limit.unwrap_or_default(),
                offset: query.offset.unwrap_or_default(),
            },
        )
        .await?
        .into_iter()
        .map(IntegrationRunResponse::from)
        .collect();

    Ok(Json(runs))
}

pub async fn get_integration_run_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<IntegrationRunResponse>> {
    let run = state.query_service.get_run(&caller, run_id.as_str()).await?;
    Ok(Json(run.into()))
}
