use super::*;

pub(super) async fn get_events(
    State(state): State<AppState>,
) -> Json<ApiResponse<BTreeMap<String, Sequence>>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetEvents).await))
}

pub(super) async fn add_event(
    State(state): State<AppState>,
    Json(req): Json<EventRequest>,
) -> Json<ApiResponse<String>> {
    let sequence = match req.into_sequence() {
        Ok(sequence) => sequence,
        Err(e) => return Json(ApiResponse::failure(e.to_string())),
    };
    Json(ApiResponse::from_result(
        ask_result(&state, |tx| ApiCommand::AddEvent(Box::new(sequence), tx)).await,
    ))
}

pub(super) async fn update_event(
    State(state): State<AppState>,
    UrlPath(key): UrlPath<String>,
    Json(req): Json<EventRequest>,
) -> Json<ApiResponse<String>> {
    let sequence = match req.into_sequence() {
        Ok(sequence) => sequence,
        Err(e) => return Json(ApiResponse::failure(e.to_string())),
    };
    match ask_result(&state, |tx| ApiCommand::UpdateEvent(key, Box::new(sequence), tx)).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn play_sequence(
    State(state): State<AppState>,
    Json(req): Json<PlaySequenceRequest>,
) -> Json<ApiResponse<PlaySequenceResponse>> {
    Json(ApiResponse::from_result(
        ask_result(&state, |tx| ApiCommand::PlaySequence(req, tx))
            .await
            .map(|run| PlaySequenceResponse { run }),
    ))
}

pub(super) async fn cancel_sequence(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<RunId>,
) -> Json<ApiResponse<String>> {
    match ask(&state, |tx| ApiCommand::CancelSequence(id, tx)).await {
        Ok(true) => Json(ApiResponse::ok()),
        Ok(false) => Json(ApiResponse::err(format!("Run {id} is not active"))),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn list_sequences(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<RunSummary>>> {
    Json(ApiResponse::from_result(
        ask(&state, ApiCommand::ListSequences).await,
    ))
}

pub(super) async fn get_flow_edges(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<EdgeProps>>> {
    Json(ApiResponse::from_result(
        ask_result(&state, ApiCommand::GetFlowEdges).await,
    ))
}

pub(super) async fn add_flow_node(
    State(state): State<AppState>,
    Json(node): Json<FlowNode>,
) -> Json<ApiResponse<String>> {
    let id = node.id.clone();
    match ask_result(&state, |tx| ApiCommand::AddFlowNode(Box::new(node), tx)).await {
        Ok(()) => Json(ApiResponse::success(id)),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn remove_flow_node(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::RemoveFlowNode(id, tx)).await,
    ))
}

pub(super) async fn connect_flow(
    State(state): State<AppState>,
    Json(edge): Json<FlowEdge>,
) -> Json<ApiResponse<String>> {
    match ask_result(&state, |tx| ApiCommand::ConnectFlow(edge, tx)).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn disconnect_flow(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<String>,
) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::DisconnectFlow(id, tx)).await,
    ))
}
