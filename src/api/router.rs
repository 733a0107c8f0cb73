use super::*;

pub(super) fn build_router(state: AppState, security: ApiSecurity) -> Router {
    Router::new()
        .route("/map", get(get_map))
        .route("/map/paint", post(paint_cell))
        .route("/map/erase", post(erase_cell))
        .route("/map/spawn", post(spawn_item))
        .route("/map/destroy", post(destroy_item))
        .route("/map/tint", post(tint_cell))
        .route("/palette", get(get_palette).post(edit_palette))
        .route("/statics", get(get_statics).post(toggle_static))
        .route(
            "/collisions",
            get(get_collisions)
                .post(set_collision)
                .delete(remove_collision),
        )
        .route("/events", get(get_events).post(add_event))
        .route("/events/{key}", axum::routing::put(update_event))
        .route("/sequences", get(list_sequences))
        .route("/sequences/play", post(play_sequence))
        .route("/sequences/{id}/cancel", post(cancel_sequence))
        .route("/flow/edges", get(get_flow_edges).post(connect_flow))
        .route("/flow/edges/{id}", axum::routing::delete(disconnect_flow))
        .route("/flow/nodes", post(add_flow_node))
        .route("/flow/nodes/{id}", axum::routing::delete(remove_flow_node))
        .route("/player", get(get_player))
        .route("/player/input", get(get_player).post(player_input))
        .route("/player/use", post(use_item))
        .route("/player/drop", post(drop_item))
        .route("/runtime", get(get_runtime).post(set_runtime))
        .route("/level/save", post(save_level))
        .route("/level/load", post(load_level))
        .route("/bus", get(get_bus))
        .route("/bus/subscribe", get(subscribe_bus))
        .with_state(state)
        .layer(middleware::from_fn_with_state(security, api_guard))
}
