use super::*;

pub async fn list_action_definitions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> ApiResult<Json<Vec<ActionDefinitionResponse>>> {
    let definitions = state
        .action_registry
        .list_definitions(&caller)
        .await?
        .into_iter()
        .map(ActionDefinitionResponse::from)
        .collect();

    Ok(Json(definitions))
}

pub async fn save_action_definition_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(payload): Json<SaveActionDefinitionRequest>,
) -> ApiResult<Json<ActionDefinitionResponse>> {
    let definition = ActionDefinition::try_from(payload)?;
    let saved = state
        .action_registry
        .save_definition(&caller, definition)
        .await?;

    Ok(Json(saved.into()))
}
