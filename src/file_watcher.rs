use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

use crate::components::BoardConfig;
use crate::events::GameEventBus;
use crate::persistence::{parse_level, LevelPath, LevelWorld};

/// Reloads the level whenever its file changes on disk.
pub struct FileWatcherPlugin;

pub enum FileWatchEvent {
    LevelChanged(String),
}

#[derive(Resource)]
pub struct FileWatcherReceiver(pub Receiver<FileWatchEvent>);

impl Plugin for FileWatcherPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx) = crossbeam_channel::unbounded::<FileWatchEvent>();
        app.insert_resource(FileWatcherReceiver(rx));

        let level_path = app
            .world()
            .get_resource::<LevelPath>()
            .map(|p| p.0.clone())
            .unwrap_or_else(|| LevelPath::default().0);
        std::thread::spawn(move || {
            run_watcher(tx, level_path);
        });

        app.add_systems(Update, process_file_watch_events);
    }
}

fn run_watcher(tx: Sender<FileWatchEvent>, level_path: PathBuf) {
    let watched = level_path.clone();
    let mut watcher: RecommendedWatcher =
        match notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                handle_fs_event(event, &tx, &watched);
            }
        }) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("[Emojiboard FileWatcher] Failed to create watcher: {e}");
                return;
            }
        };

    // notify needs a directory to see a single file being replaced
    let parent = match level_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        eprintln!("[Emojiboard FileWatcher] Failed to watch {}: {e}", parent.display());
        return;
    }
    println!(
        "[Emojiboard FileWatcher] Watching level: {}",
        level_path.display()
    );

    // the watcher stops when dropped
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

fn handle_fs_event(event: NotifyEvent, tx: &Sender<FileWatchEvent>, level_path: &Path) {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    for path in &event.paths {
        if path_matches(path, level_path) {
            if let Ok(content) = std::fs::read_to_string(path) {
                let _ = tx.send(FileWatchEvent::LevelChanged(content));
            }
        }
    }
}

fn path_matches(a: &Path, b: &Path) -> bool {
    let ca = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let cb = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    ca == cb
}

fn process_file_watch_events(
    watcher: Option<Res<FileWatcherReceiver>>,
    config: Res<BoardConfig>,
    mut level: LevelWorld,
    mut bus: ResMut<GameEventBus>,
) {
    let Some(watcher) = watcher else { return };

    // editors write in bursts; only the newest content matters
    let Some(FileWatchEvent::LevelChanged(content)) = watcher.0.try_iter().take(16).last() else {
        return;
    };
    match parse_level(&content, config.side_length) {
        // our own save coming back; reloading would end a play session
        Ok(file) if file == level.capture() => {}
        Ok(file) => {
            println!("[Emojiboard FileWatcher] Reloading level");
            level.apply(file);
            bus.emit("level_loaded", serde_json::json!({ "source": "watch" }), None);
        }
        Err(e) => {
            warn!("[Emojiboard FileWatcher] Ignoring level change: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collisions::CollisionTable;
    use crate::entities::{Condition, Controllable, Interactable};
    use crate::flow_graph::FlowGraph;
    use crate::game_runtime::{apply_action, RuntimeAction, RuntimeState};
    use crate::grid::{CellId, EditableMap};
    use crate::interpreter::SequenceRunner;
    use crate::player::{ItemHealth, PlayerState};
    use crate::sequence::Sequence;
    use crate::store::{ColorPalette, KeyedStore, Statics};

    fn watched_app() -> (App, Sender<FileWatchEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut app = App::new();
        app.insert_resource(FileWatcherReceiver(rx))
            .insert_resource(BoardConfig::default())
            .insert_resource(GameEventBus::default())
            .insert_resource(EditableMap::default())
            .insert_resource(KeyedStore::<Sequence>::default())
            .insert_resource(KeyedStore::<Condition>::default())
            .insert_resource(KeyedStore::<Interactable>::default())
            .insert_resource(KeyedStore::<Controllable>::default())
            .insert_resource(CollisionTable::default())
            .insert_resource(FlowGraph::default())
            .insert_resource(ColorPalette::default())
            .insert_resource(Statics::default())
            .insert_resource(PlayerState::default())
            .insert_resource(ItemHealth::default())
            .insert_resource(SequenceRunner::default())
            .insert_resource(RuntimeState::default())
            .add_systems(Update, process_file_watch_events);
        (app, tx)
    }

    #[test]
    fn own_save_does_not_end_play() {
        let (mut app, tx) = watched_app();
        let world = app.world_mut();
        world.resource_mut::<EditableMap>().spawn(4, "🌵").unwrap();
        world.resource_scope(|world, mut runtime: Mut<RuntimeState>| {
            let map = world.resource::<EditableMap>().clone();
            let player = world.resource::<PlayerState>().clone();
            runtime.start_play(&map, &player);
        });
        // play changes the live board
        world.resource_mut::<EditableMap>().destroy(4).unwrap();

        let mut saved = crate::persistence::LevelFile::empty(&BoardConfig::default());
        saved.map.spawn(4, "🌵").unwrap();
        saved.player = Some(PlayerState::default());
        tx.send(FileWatchEvent::LevelChanged(
            serde_json::to_string(&saved).unwrap(),
        ))
        .unwrap();
        app.update();

        let world = app.world_mut();
        assert!(world.resource::<RuntimeState>().edited().is_some());
        assert_eq!(world.resource::<EditableMap>().item_at(CellId::new(0, 4)), None);

        let mut runtime = world.remove_resource::<RuntimeState>().unwrap();
        let mut map = world.remove_resource::<EditableMap>().unwrap();
        let mut player = world.remove_resource::<PlayerState>().unwrap();
        let mut health = ItemHealth::default();
        apply_action(
            RuntimeAction::Stop,
            &mut runtime,
            &mut map,
            &mut player,
            &mut health,
            &mut SequenceRunner::default(),
            &mut GameEventBus::default(),
        );
        assert_eq!(map.item_at(CellId::new(0, 4)), Some("🌵"));
    }

    #[test]
    fn changed_file_is_reloaded() {
        let (mut app, tx) = watched_app();
        let mut edited = crate::persistence::LevelFile::empty(&BoardConfig::default());
        edited.map.spawn(2, "🌻").unwrap();
        tx.send(FileWatchEvent::LevelChanged(
            serde_json::to_string(&edited).unwrap(),
        ))
        .unwrap();
        app.update();
        assert_eq!(
            app.world().resource::<EditableMap>().item_at(CellId::new(0, 2)),
            Some("🌻")
        );
    }

    #[test]
    fn paths_match_through_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("level.json");
        std::fs::write(&file, "{}").unwrap();
        let indirect = dir.path().join(".").join("level.json");
        assert!(path_matches(&indirect, &file));
        assert!(!path_matches(&dir.path().join("other.json"), &file));
    }

    #[test]
    fn only_the_level_file_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let level = dir.path().join("level.json");
        let other = dir.path().join("notes.txt");
        std::fs::write(&level, r#"{"version":2}"#).unwrap();
        std::fs::write(&other, "hi").unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let event = NotifyEvent::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(other)
            .add_path(level.clone());
        handle_fs_event(event, &tx, &level);

        let got: Vec<String> = rx
            .try_iter()
            .map(|FileWatchEvent::LevelChanged(c)| c)
            .collect();
        assert_eq!(got, vec![r#"{"version":2}"#.to_string()]);
    }
}
