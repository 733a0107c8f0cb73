use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::collisions::CollisionTable;
use crate::components::BoardConfig;
use crate::entities::{Condition, Controllable, Interactable};
use crate::error::BoardError;
use crate::flow_graph::FlowGraph;
use crate::game_runtime::RuntimeState;
use crate::grid::{checked_cell_count, EditableMap, LegacyEditableMap};
use crate::interpreter::SequenceRunner;
use crate::player::{ItemHealth, PlayerState};
use crate::sequence::{check_step_records, Sequence};
use crate::store::{ColorPalette, KeyedStore, Statics};

/// Version written by this build. Version 1 files carry the legacy map.
pub const LEVEL_FORMAT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LevelFile {
    pub version: u32,
    pub map: EditableMap,
    #[serde(default)]
    pub events: BTreeMap<String, Sequence>,
    #[serde(default)]
    pub conditions: BTreeMap<String, Condition>,
    #[serde(default)]
    pub collisions: CollisionTable,
    #[serde(default)]
    pub interactables: BTreeMap<String, Interactable>,
    #[serde(default)]
    pub controllables: BTreeMap<String, Controllable>,
    #[serde(default)]
    pub flow: FlowGraph,
    #[serde(default)]
    pub palette: ColorPalette,
    #[serde(default)]
    pub statics: Statics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerState>,
}

impl LevelFile {
    pub fn empty(config: &BoardConfig) -> Self {
        Self {
            version: LEVEL_FORMAT_VERSION,
            map: EditableMap::from_config(config),
            events: BTreeMap::new(),
            conditions: BTreeMap::new(),
            collisions: CollisionTable::default(),
            interactables: BTreeMap::new(),
            controllables: BTreeMap::new(),
            flow: FlowGraph::default(),
            palette: ColorPalette::default(),
            statics: Statics::default(),
            player: None,
        }
    }

    /// Interactables saved against a stored event get that event's steps.
    fn resolve_interactable_events(&mut self) -> Result<(), BoardError> {
        for (key, interactable) in &mut self.interactables {
            let Some(event) = interactable.legacy_event.take() else {
                continue;
            };
            if !interactable.sequence.is_empty() {
                continue;
            }
            let sequence = self.events.get(&event).ok_or_else(|| {
                BoardError::config(format!(
                    "interactable '{key}' names missing event '{event}'"
                ))
            })?;
            interactable.sequence = sequence.steps.clone();
        }
        Ok(())
    }

    /// Check everything that would otherwise fail mid-play.
    pub fn validate(&self) -> Result<(), BoardError> {
        let side = self.map.side_length;
        checked_cell_count(side)?;
        for (key, sequence) in &self.events {
            sequence
                .compile(side)
                .map_err(|e| BoardError::config(format!("event '{key}': {e}")))?;
        }
        for (key, interactable) in &self.interactables {
            interactable.validate()?;
            Sequence::new(key.clone(), interactable.sequence.clone())
                .compile(side)
                .map_err(|e| BoardError::config(format!("interactable '{key}': {e}")))?;
        }
        for controllable in self.controllables.values() {
            controllable.validate()?;
        }
        self.flow.derive_edges()?;
        self.flow.validate_acyclic()?;
        if let Some(player) = &self.player {
            self.map.check(player.cell)?;
        }
        Ok(())
    }
}

/// Parse and validate a level, migrating version 1 maps.
pub fn parse_level(json: &str, side_length: usize) -> Result<LevelFile, BoardError> {
    let mut value: serde_json::Value = serde_json::from_str(json)?;
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;

    if version > LEVEL_FORMAT_VERSION {
        return Err(BoardError::Persistence(format!(
            "level format version {version} is newer than supported {LEVEL_FORMAT_VERSION}"
        )));
    }
    if version == 1 {
        let legacy_map = value
            .get("map")
            .cloned()
            .ok_or_else(|| BoardError::Persistence("level has no map".into()))?;
        let legacy: LegacyEditableMap = serde_json::from_value(legacy_map)?;
        let map = legacy.migrate(side_length)?;
        value["map"] = serde_json::to_value(&map)?;
        value["version"] = serde_json::json!(LEVEL_FORMAT_VERSION);
        info!("[Emojiboard persistence] Migrated version 1 level");
    }

    check_step_kinds(&value)?;
    let mut level: LevelFile = serde_json::from_value(value)?;
    level.resolve_interactable_events()?;
    level.validate()?;
    Ok(level)
}

/// Every `sequence` array in events and interactables, checked record by record.
fn check_step_kinds(value: &serde_json::Value) -> Result<(), BoardError> {
    let records = ["events", "interactables"]
        .into_iter()
        .filter_map(|section| value.get(section)?.as_object())
        .flat_map(|entries| entries.values())
        .filter_map(|entry| entry.get("sequence")?.as_array());
    for steps in records {
        check_step_records(steps)?;
    }
    Ok(())
}

pub fn read_level_file(path: &Path, side_length: usize) -> Result<LevelFile, BoardError> {
    let body = std::fs::read_to_string(path)?;
    parse_level(&body, side_length)
}

pub fn write_level_file(path: &Path, level: &LevelFile) -> Result<(), BoardError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(level)?;
    std::fs::write(path, body)?;
    Ok(())
}

/// Where the level lives on disk.
#[derive(Resource, Clone, Debug)]
pub struct LevelPath(pub PathBuf);

impl Default for LevelPath {
    fn default() -> Self {
        Self(PathBuf::from("level.json"))
    }
}

/// Every resource a level file maps onto.
#[derive(SystemParam)]
pub struct LevelWorld<'w> {
    pub map: ResMut<'w, EditableMap>,
    pub events: ResMut<'w, KeyedStore<Sequence>>,
    pub conditions: ResMut<'w, KeyedStore<Condition>>,
    pub collisions: ResMut<'w, CollisionTable>,
    pub interactables: ResMut<'w, KeyedStore<Interactable>>,
    pub controllables: ResMut<'w, KeyedStore<Controllable>>,
    pub flow: ResMut<'w, FlowGraph>,
    pub palette: ResMut<'w, ColorPalette>,
    pub statics: ResMut<'w, Statics>,
    pub player: ResMut<'w, PlayerState>,
    pub health: ResMut<'w, ItemHealth>,
    pub runner: ResMut<'w, SequenceRunner>,
    pub runtime: ResMut<'w, RuntimeState>,
}

impl LevelWorld<'_> {
    /// The level as edited. During play that is the board from before play
    /// started, not the live one.
    pub fn capture(&self) -> LevelFile {
        let (map, player) = match self.runtime.edited() {
            Some(edited) => (edited.map.clone(), edited.player.clone()),
            None => (self.map.clone(), self.player.clone()),
        };
        LevelFile {
            version: LEVEL_FORMAT_VERSION,
            map,
            events: self.events.entries().clone(),
            conditions: self.conditions.entries().clone(),
            collisions: self.collisions.clone(),
            interactables: self.interactables.entries().clone(),
            controllables: self.controllables.entries().clone(),
            flow: self.flow.clone(),
            palette: self.palette.clone(),
            statics: self.statics.clone(),
            player: Some(player),
        }
    }

    /// Replace the level. Running sequences and any play snapshot are dropped.
    pub fn apply(&mut self, level: LevelFile) {
        self.runner.cancel_all();
        self.runtime.forget_snapshot();
        self.health.0.clear();
        *self.map = level.map;
        self.events.replace(level.events);
        self.conditions.replace(level.conditions);
        *self.collisions = level.collisions;
        self.interactables.replace(level.interactables);
        self.controllables.replace(level.controllables);
        *self.flow = level.flow;
        *self.palette = level.palette;
        *self.statics = level.statics;
        if let Some(player) = level.player {
            *self.player = player;
        }
    }
}

pub struct LevelPlugin {
    pub path: PathBuf,
}

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<BoardConfig>()
            .cloned()
            .unwrap_or_default();
        app.insert_resource(LevelPath(self.path.clone()))
            .insert_resource(EditableMap::from_config(&config))
            .insert_resource(KeyedStore::<Sequence>::default())
            .insert_resource(KeyedStore::<Condition>::default())
            .insert_resource(KeyedStore::<Interactable>::default())
            .insert_resource(KeyedStore::<Controllable>::default())
            .insert_resource(CollisionTable::default())
            .insert_resource(FlowGraph::default())
            .insert_resource(ColorPalette::default())
            .insert_resource(Statics::default())
            .add_systems(Startup, load_startup_level);
    }
}

fn load_startup_level(path: Res<LevelPath>, config: Res<BoardConfig>, mut level: LevelWorld) {
    if !path.0.exists() {
        println!(
            "[Emojiboard] No level at {}, starting with an empty board",
            path.0.display()
        );
        return;
    }
    match read_level_file(&path.0, config.side_length) {
        Ok(file) => {
            println!("[Emojiboard] Loaded level {}", path.0.display());
            level.apply(file);
        }
        Err(e) => {
            eprintln!("[Emojiboard] Failed to load {}: {e}", path.0.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellId;
    use crate::sequence::SequenceStep;

    #[test]
    fn legacy_level_is_migrated() {
        let legacy = serde_json::json!({
            "version": 1,
            "map": {
                "items": { "13": { "index": 13, "emoji": "🐸" } },
                "backgrounds": { "0": "#112233" },
                "objective": "reach the lily"
            }
        });
        let level = parse_level(&legacy.to_string(), 12).unwrap();
        assert_eq!(level.version, LEVEL_FORMAT_VERSION);
        assert_eq!(level.map.item_at(CellId::new(1, 1)), Some("🐸"));
        assert_eq!(level.map.background_at(CellId::new(0, 0)), "#112233");
    }

    #[test]
    fn legacy_level_with_bad_index_is_rejected() {
        let legacy = serde_json::json!({
            "version": 1,
            "map": { "items": { "x": { "index": 500, "emoji": "🐸" } } }
        });
        assert!(matches!(
            parse_level(&legacy.to_string(), 12),
            Err(BoardError::Bounds { .. })
        ));
    }

    #[test]
    fn future_versions_are_rejected() {
        let json = serde_json::json!({ "version": 99, "map": {} }).to_string();
        assert!(matches!(
            parse_level(&json, 12),
            Err(BoardError::Persistence(_))
        ));
    }

    #[test]
    fn invalid_event_fails_the_load() {
        let mut level = LevelFile::empty(&BoardConfig::default());
        level.events.insert(
            "1".into(),
            Sequence::new(
                "bad",
                vec![SequenceStep::Spawn {
                    index: 200,
                    emoji: "🌟".into(),
                }],
            ),
        );
        let json = serde_json::to_string(&level).unwrap();
        let err = parse_level(&json, 12).unwrap_err();
        assert!(err.to_string().contains("event '1'"), "{err}");
    }

    #[test]
    fn unusable_side_length_is_a_configuration_error() {
        for side in [0u64, 5_000_000_000] {
            let json = serde_json::json!({
                "version": 2,
                "map": { "sideLength": side },
                "events": { "1": { "name": "e", "sequence": [{ "type": "destroy", "index": 0 }] } }
            });
            assert!(
                matches!(parse_level(&json.to_string(), 12), Err(BoardError::Configuration(_))),
                "{side}"
            );
        }
    }

    #[test]
    fn unknown_step_kind_in_file_is_a_configuration_error() {
        let json = serde_json::json!({
            "version": 2,
            "map": {},
            "events": { "1": { "name": "boom", "sequence": [{ "type": "explode", "index": 0 }] } }
        });
        match parse_level(&json.to_string(), 12) {
            Err(BoardError::Configuration(msg)) => assert!(msg.contains("explode"), "{msg}"),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn interactable_event_keys_are_resolved_into_sequences() {
        let json = serde_json::json!({
            "version": 2,
            "map": {},
            "events": { "7": { "name": "crack", "sequence": [{ "type": "paint", "index": 3, "background": "#000000" }] } },
            "interactables": { "1": { "emoji": "🪨", "eventId": "7", "hp": 2 } }
        });
        let level = parse_level(&json.to_string(), 12).unwrap();
        let rock = &level.interactables["1"];
        assert!(rock.legacy_event.is_none());
        assert_eq!(
            rock.sequence,
            vec![SequenceStep::Paint {
                index: 3,
                background: "#000000".into()
            }]
        );

        let dangling = serde_json::json!({
            "version": 2,
            "map": {},
            "interactables": { "1": { "emoji": "🪨", "eventId": "9", "hp": 2 } }
        });
        assert!(matches!(
            parse_level(&dangling.to_string(), 12),
            Err(BoardError::Configuration(_))
        ));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels").join("pond.json");

        let mut level = LevelFile::empty(&BoardConfig::default());
        level.map.spawn(5, "🪷").unwrap();
        level
            .events
            .insert("1".into(), Sequence::new("bloom", vec![SequenceStep::CompleteLevel]));
        level.palette.add_color("#ff0000");
        write_level_file(&path, &level).unwrap();

        let loaded = read_level_file(&path, 12).unwrap();
        assert_eq!(loaded, level);
    }

    #[test]
    fn level_loads_into_world_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.json");
        let mut level = LevelFile::empty(&BoardConfig::default());
        level.map.spawn(0, "🐸").unwrap();
        level.conditions.insert(
            "4".into(),
            Condition {
                a: "🐸".into(),
                b: crate::entities::SideEffectTarget::Any,
                event_id: "1".into(),
            },
        );
        write_level_file(&path, &level).unwrap();

        let mut app = App::new();
        app.insert_resource(BoardConfig::default())
            .insert_resource(PlayerState::default())
            .insert_resource(ItemHealth::default())
            .insert_resource(SequenceRunner::default())
            .insert_resource(RuntimeState::default())
            .add_plugins(LevelPlugin { path });
        app.update();

        let world = app.world();
        assert_eq!(
            world.resource::<EditableMap>().item_at(CellId::new(0, 0)),
            Some("🐸")
        );
        let mut conditions = world.resource::<KeyedStore<Condition>>().entries().keys();
        assert_eq!(conditions.next().map(String::as_str), Some("4"));
    }
}
