use super::*;

pub(super) async fn get_map(State(state): State<AppState>) -> Json<ApiResponse<EditableMap>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetMap).await))
}

async fn edit_map(state: &AppState, edit: MapEdit) -> Json<ApiResponse<String>> {
    match ask_result(state, |tx| ApiCommand::EditMap(edit, tx)).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn paint_cell(
    State(state): State<AppState>,
    Json(req): Json<PaintRequest>,
) -> Json<ApiResponse<String>> {
    edit_map(
        &state,
        MapEdit::Paint {
            index: req.index,
            background: req.background,
        },
    )
    .await
}

pub(super) async fn erase_cell(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Json<ApiResponse<String>> {
    edit_map(&state, MapEdit::Erase { index: req.index }).await
}

pub(super) async fn spawn_item(
    State(state): State<AppState>,
    Json(req): Json<SpawnRequest>,
) -> Json<ApiResponse<String>> {
    edit_map(
        &state,
        MapEdit::Spawn {
            index: req.index,
            emoji: req.emoji,
        },
    )
    .await
}

pub(super) async fn destroy_item(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Json<ApiResponse<String>> {
    edit_map(&state, MapEdit::Destroy { index: req.index }).await
}

pub(super) async fn tint_cell(
    State(state): State<AppState>,
    Json(req): Json<TintRequest>,
) -> Json<ApiResponse<String>> {
    edit_map(
        &state,
        MapEdit::Tint {
            index: req.index,
            color: req.color,
        },
    )
    .await
}

pub(super) async fn get_palette(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetPalette).await))
}

pub(super) async fn edit_palette(
    State(state): State<AppState>,
    Json(req): Json<PaletteRequest>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::EditPalette(req, tx)).await,
    ))
}

pub(super) async fn get_statics(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetStatics).await))
}

pub(super) async fn toggle_static(
    State(state): State<AppState>,
    Json(req): Json<StaticRequest>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::ToggleStatic(req, tx)).await,
    ))
}

pub(super) async fn get_collisions(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<CollisionRule>>> {
    Json(ApiResponse::from_result(
        ask(&state, ApiCommand::GetCollisions).await,
    ))
}

pub(super) async fn set_collision(
    State(state): State<AppState>,
    Json(req): Json<CollisionRequest>,
) -> Json<ApiResponse<String>> {
    match ask_result(&state, |tx| ApiCommand::SetCollision(req, tx)).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => Json(ApiResponse::err(e)),
    }
}

pub(super) async fn remove_collision(
    State(state): State<AppState>,
    Json(req): Json<CollisionPairRequest>,
) -> Json<ApiResponse<bool>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::RemoveCollision(req, tx)).await,
    ))
}

pub(super) async fn get_player(State(state): State<AppState>) -> Json<ApiResponse<PlayerView>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetPlayer).await))
}

pub(super) async fn player_input(
    State(state): State<AppState>,
    Json(req): Json<PlayerInputRequest>,
) -> Json<ApiResponse<MoveReport>> {
    Json(ApiResponse::from_result(
        ask_result(&state, |tx| ApiCommand::MovePlayer(req.direction, tx)).await,
    ))
}

pub(super) async fn use_item(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> Json<ApiResponse<Effector>> {
    Json(ApiResponse::from_result(
        ask_result(&state, |tx| ApiCommand::UseItem(req.slot, tx)).await,
    ))
}

pub(super) async fn drop_item(
    State(state): State<AppState>,
    Json(req): Json<SlotRequest>,
) -> Json<ApiResponse<Effector>> {
    match ask(&state, |tx| ApiCommand::DropItem(req.slot, tx)).await {
        Ok(Some(item)) => Json(ApiResponse::success(item)),
        Ok(None) => Json(ApiResponse::failure(format!("slot {} is empty", req.slot))),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}

pub(super) async fn get_runtime(State(state): State<AppState>) -> Json<ApiResponse<RuntimeView>> {
    Json(ApiResponse::from_result(ask(&state, ApiCommand::GetRuntime).await))
}

pub(super) async fn set_runtime(
    State(state): State<AppState>,
    Json(req): Json<RuntimeRequest>,
) -> Json<ApiResponse<RuntimeView>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::Runtime(req.action, tx)).await,
    ))
}

pub(super) async fn save_level(
    State(state): State<AppState>,
    body: Option<Json<LevelPathRequest>>,
) -> Json<ApiResponse<String>> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let level = match ask(&state, ApiCommand::GetLevel).await {
        Ok(level) => level,
        Err(e) => return Json(ApiResponse::err(e)),
    };
    let path = level_path(&state, &req);
    if let Err(e) = write_level_file(&path, &level) {
        return Json(ApiResponse::err(format!("Failed to write level: {e}")));
    }
    Json(ApiResponse::success(path.to_string_lossy().to_string()))
}

pub(super) async fn load_level(
    State(state): State<AppState>,
    body: Option<Json<LevelPathRequest>>,
) -> Json<ApiResponse<LevelLoadResult>> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let path = level_path(&state, &req);
    let raw = match std::fs::read_to_string(&path) {
        Ok(v) => v,
        Err(e) => return Json(ApiResponse::failure(format!("Failed to read level: {e}"))),
    };
    let level = match parse_level(&raw, state.side_length) {
        Ok(v) => v,
        Err(e) => return Json(ApiResponse::failure(format!("Invalid level: {e}"))),
    };
    let result = LevelLoadResult {
        path: path.to_string_lossy().to_string(),
        events: level.events.len(),
        interactables: level.interactables.len(),
        flow_nodes: level.flow.nodes.len(),
    };
    match ask(&state, |tx| ApiCommand::LoadLevel(Box::new(level), tx)).await {
        Ok(()) => Json(ApiResponse::success(result)),
        Err(e) => Json(ApiResponse::failure(e)),
    }
}
