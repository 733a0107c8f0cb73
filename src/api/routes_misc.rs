use super::*;

pub(super) async fn get_bus(
    State(state): State<AppState>,
    Query(query): Query<BusQuery>,
) -> Json<ApiResponse<Vec<GameEvent>>> {
    Json(ApiResponse::from_result(
        ask(&state, |tx| ApiCommand::GetBus(query.since, tx)).await,
    ))
}

/// Stream bus events as they are emitted, starting after `since`.
pub(super) async fn subscribe_bus(
    State(state): State<AppState>,
    Query(query): Query<BusQuery>,
) -> impl IntoResponse {
    let sender = state.sender.clone();
    let stream = async_stream::stream! {
        let mut tick = tokio::time::interval(std::time::Duration::from_millis(100));
        let mut last_seq = query.since.unwrap_or(0);
        loop {
            tick.tick().await;
            let (tx, rx) = tokio::sync::oneshot::channel();
            if sender.send(ApiCommand::GetBus(Some(last_seq), tx)).is_err() {
                break;
            }
            let Ok(events) = rx.await else {
                break;
            };
            for ev in &events {
                last_seq = last_seq.max(ev.seq);
                let payload = serde_json::to_string(ev).unwrap_or_else(|_| "{}".to_string());
                yield Ok::<SseEvent, Infallible>(SseEvent::default().event("game_event").data(payload));
            }
        }
    };
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(5))
            .text("keep-alive"),
    )
}
