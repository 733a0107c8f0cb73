use bevy::prelude::*;
use bevy::utils::Instant;
use serde::Serialize;

use crate::events::GameEventBus;
use crate::grid::EditableMap;
use crate::interpreter::{cancel_all_runs, SequenceRunner};
use crate::player::{ItemHealth, PlayerState};

#[derive(States, Default, Clone, Copy, Eq, PartialEq, Debug, Hash, Serialize)]
pub enum PlayPhase {
    #[default]
    Editing,
    Playing,
    Paused,
    LevelComplete,
}

/// Board and player as they were when play started.
#[derive(Clone, Debug)]
pub struct PlaySnapshot {
    pub map: EditableMap,
    pub player: PlayerState,
}

#[derive(Resource, Clone)]
pub struct RuntimeState {
    pub phase: PlayPhase,
    entered_at: Instant,
    snapshot: Option<PlaySnapshot>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            phase: PlayPhase::Editing,
            entered_at: Instant::now(),
            snapshot: None,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct RuntimeStateSnapshot {
    pub phase: PlayPhase,
    pub time_in_state_seconds: f32,
    pub has_snapshot: bool,
}

/// Play-mode transitions the API and keyboard can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeAction {
    Play,
    Pause,
    Resume,
    Stop,
    Reset,
}

impl RuntimeState {
    fn enter(&mut self, phase: PlayPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.entered_at = Instant::now();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase == PlayPhase::Playing
    }

    pub fn snapshot(&self) -> RuntimeStateSnapshot {
        RuntimeStateSnapshot {
            phase: self.phase,
            time_in_state_seconds: self.entered_at.elapsed().as_secs_f32(),
            has_snapshot: self.snapshot.is_some(),
        }
    }

    /// Remember the board and start playing. Already playing is a no-op.
    pub fn start_play(&mut self, map: &EditableMap, player: &PlayerState) {
        if self.snapshot.is_none() {
            self.snapshot = Some(PlaySnapshot {
                map: map.clone(),
                player: player.clone(),
            });
        }
        self.enter(PlayPhase::Playing);
    }

    pub fn pause(&mut self) {
        if self.phase == PlayPhase::Playing {
            self.enter(PlayPhase::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == PlayPhase::Paused {
            self.enter(PlayPhase::Playing);
        }
    }

    pub fn complete(&mut self) {
        if self.phase != PlayPhase::Editing {
            self.enter(PlayPhase::LevelComplete);
        }
    }

    /// Put the board back the way it was when play started.
    pub fn restore(&self, map: &mut EditableMap, player: &mut PlayerState, health: &mut ItemHealth) {
        if let Some(snap) = &self.snapshot {
            *map = snap.map.clone();
            *player = snap.player.clone();
        }
        health.0.clear();
    }

    /// Restart the level from its snapshot and keep playing.
    pub fn reset(&mut self, map: &mut EditableMap, player: &mut PlayerState, health: &mut ItemHealth) {
        self.restore(map, player, health);
        if self.snapshot.is_some() {
            self.enter(PlayPhase::Playing);
        }
    }

    /// Leave play mode, restoring the edited board.
    pub fn stop(&mut self, map: &mut EditableMap, player: &mut PlayerState, health: &mut ItemHealth) {
        self.restore(map, player, health);
        self.snapshot = None;
        self.enter(PlayPhase::Editing);
    }

    /// The edited board while a play session is running over it.
    pub fn edited(&self) -> Option<&PlaySnapshot> {
        self.snapshot.as_ref()
    }

    /// Drop the snapshot, e.g. after a new level was loaded.
    pub fn forget_snapshot(&mut self) {
        self.snapshot = None;
    }
}

/// Apply a runtime action to every resource it touches.
pub fn apply_action(
    action: RuntimeAction,
    runtime: &mut RuntimeState,
    map: &mut EditableMap,
    player: &mut PlayerState,
    health: &mut ItemHealth,
    runner: &mut SequenceRunner,
    bus: &mut GameEventBus,
) {
    match action {
        RuntimeAction::Play => runtime.start_play(map, player),
        RuntimeAction::Pause => runtime.pause(),
        RuntimeAction::Resume => runtime.resume(),
        RuntimeAction::Stop => {
            cancel_all_runs(runner, bus);
            runtime.stop(map, player, health);
        }
        RuntimeAction::Reset => {
            cancel_all_runs(runner, bus);
            runtime.reset(map, player, health);
        }
    }
}

#[derive(Resource, Default)]
struct RuntimeEventCursor {
    last_seq: u64,
}

fn sync_bevy_state_from_runtime(
    runtime: Res<RuntimeState>,
    state: Res<State<PlayPhase>>,
    mut next_state: ResMut<NextState<PlayPhase>>,
) {
    if state.get() != &runtime.phase {
        next_state.set(runtime.phase);
    }
}

fn apply_runtime_events(
    mut bus: ResMut<GameEventBus>,
    mut runtime: ResMut<RuntimeState>,
    mut cursor: ResMut<RuntimeEventCursor>,
    mut map: ResMut<EditableMap>,
    mut player: ResMut<PlayerState>,
    mut health: ResMut<ItemHealth>,
    mut runner: ResMut<SequenceRunner>,
) {
    let actions: Vec<RuntimeAction> = bus
        .since(cursor.last_seq)
        .filter_map(|ev| match ev.name.as_str() {
            "level_reset" => Some(RuntimeAction::Reset),
            "game_pause" => Some(RuntimeAction::Pause),
            "game_resume" => Some(RuntimeAction::Resume),
            _ => None,
        })
        .collect();
    let completed = bus
        .since(cursor.last_seq)
        .any(|ev| ev.name == "level_complete");

    for action in actions {
        info!("[Emojiboard runtime] {:?}", action);
        apply_action(
            action,
            &mut runtime,
            &mut map,
            &mut player,
            &mut health,
            &mut runner,
            &mut bus,
        );
    }
    if completed {
        cancel_all_runs(&mut runner, &mut bus);
        runtime.complete();
        info!("[Emojiboard runtime] Level complete");
    }
    // our own cancellation events need no handling
    cursor.last_seq = bus.last_seq();
}

pub struct RuntimeStatePlugin;

impl Plugin for RuntimeStatePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(RuntimeState::default())
            .insert_resource(RuntimeEventCursor::default())
            .init_state::<PlayPhase>()
            .add_systems(
                PostUpdate,
                (apply_runtime_events, sync_bevy_state_from_runtime).chain(),
            );
    }
}
