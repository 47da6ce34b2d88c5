use super::*;

pub async fn list_usage_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<IntegrationListQueryParams>,
) -> ApiResult<Json<Vec<UsageAuditEntryResponse>>> {
    let entries = state
        .query_service
        .list_usage(
            &caller,
            UsageAuditQuery {
                action_name: non_empty(query.action_name),
                status: parse_usage_status(query.status)?,
                limit: query.limit.unwrap_or_default(),
                offset: query.offset.unwrap_or_default(),
            },
        )
        .await?
        .into_iter()
        .map(UsageAuditEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
