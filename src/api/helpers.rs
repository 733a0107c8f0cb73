use super::*;

/// Send a command to the world and wait for its reply.
pub(super) async fn ask<T>(
    state: &AppState,
    make: impl FnOnce(tokio::sync::oneshot::Sender<T>) -> ApiCommand,
) -> Result<T, String> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    state
        .sender
        .send(make(tx))
        .map_err(|_| "Channel closed".to_string())?;
    rx.await.map_err(|_| "Channel closed".to_string())
}

/// Like [`ask`] for commands that reply with their own `Result`.
pub(super) async fn ask_result<T>(
    state: &AppState,
    make: impl FnOnce(tokio::sync::oneshot::Sender<Result<T, String>>) -> ApiCommand,
) -> Result<T, String> {
    ask(state, make).await?
}

/// Resolve a requested level path against the configured default.
pub(super) fn level_path(state: &AppState, req: &LevelPathRequest) -> PathBuf {
    req.path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.level_path.clone())
}
