use super::*;

#[derive(Clone)]
pub(super) struct AppState {
    pub(super) sender: Sender<ApiCommand>,
    /// Default target of `/level/save` and `/level/load`.
    pub(super) level_path: PathBuf,
    pub(super) side_length: usize,
}
