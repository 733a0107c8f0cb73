use bevy::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::components::BoardConfig;
use crate::entities::Controllable;
use crate::error::BoardError;
use crate::events::GameEventBus;
use crate::game_runtime::PlayPhase;
use crate::grid::EditableMap;
use crate::inventory::Effector;
use crate::player::{ItemHealth, PlayWorld, PlayerState};
use crate::sequence::{Op, Program, Sequence, SequenceStep};
use crate::store::KeyedStore;

const MAX_HISTORY: usize = 64;

pub struct InterpreterPlugin;

impl Plugin for InterpreterPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SequenceRunner::default()).add_systems(
            Update,
            tick_sequences.run_if(in_state(PlayPhase::Playing)),
        );
    }
}

/// Everything a sequence step can change. The board implements it for play;
/// tests plug in lighter targets.
pub trait MutationTarget {
    fn paint(&mut self, index: i32, background: &str) -> Result<(), BoardError>;
    fn erase(&mut self, index: i32) -> Result<(), BoardError>;
    fn spawn(&mut self, index: i32, emoji: &str) -> Result<(), BoardError>;
    fn destroy(&mut self, index: i32) -> Result<(), BoardError>;
    fn add_to_player_inventory(&mut self, item: Effector) -> Result<(), BoardError>;
    fn teleport_player_to(&mut self, index: i32) -> Result<(), BoardError>;
    fn change_player_to(&mut self, emoji: &str) -> Result<(), BoardError>;
    fn add_to_player_hp(&mut self, points: i32) -> Result<(), BoardError>;
}

impl MutationTarget for EditableMap {
    fn paint(&mut self, index: i32, background: &str) -> Result<(), BoardError> {
        EditableMap::paint(self, index, background)
    }

    fn erase(&mut self, index: i32) -> Result<(), BoardError> {
        EditableMap::erase(self, index)
    }

    fn spawn(&mut self, index: i32, emoji: &str) -> Result<(), BoardError> {
        EditableMap::spawn(self, index, emoji)
    }

    fn destroy(&mut self, index: i32) -> Result<(), BoardError> {
        EditableMap::destroy(self, index)
    }

    fn add_to_player_inventory(&mut self, _item: Effector) -> Result<(), BoardError> {
        Err(BoardError::config("no player on a bare map"))
    }

    fn teleport_player_to(&mut self, _index: i32) -> Result<(), BoardError> {
        Err(BoardError::config("no player on a bare map"))
    }

    fn change_player_to(&mut self, _emoji: &str) -> Result<(), BoardError> {
        Err(BoardError::config("no player on a bare map"))
    }

    fn add_to_player_hp(&mut self, _points: i32) -> Result<(), BoardError> {
        Err(BoardError::config("no player on a bare map"))
    }
}

/// Signal a terminal step sends to the game loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSignal {
    Reset,
    Complete,
}

pub type RunId = u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running { cursor: usize },
    Completed,
    Cancelled,
    Failed { error: String },
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed { .. }
        )
    }
}

/// One sequence in flight with its own cursor.
#[derive(Clone, Debug)]
pub struct SequenceRun {
    pub id: RunId,
    pub program: Program,
    pub state: RunState,
    /// Time spent on the current delay op.
    pub waited_ms: u32,
    pub started_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub id: RunId,
    pub name: String,
    #[serde(flatten)]
    pub state: RunState,
    pub total_ops: usize,
    pub started_at_ms: u64,
}

impl SequenceRun {
    fn summary(&self) -> RunSummary {
        RunSummary {
            id: self.id,
            name: self.program.name.clone(),
            state: self.state.clone(),
            total_ops: self.program.len(),
            started_at_ms: self.started_at_ms,
        }
    }
}

/// What happened to a run during a tick.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Step {
        run: RunId,
        cursor: usize,
        kind: &'static str,
        /// Authored step position and loop pass; `None` for loop gaps.
        origin: Option<(usize, u32)>,
    },
    Completed {
        run: RunId,
    },
    Failed {
        run: RunId,
        error: BoardError,
    },
    Signal {
        run: RunId,
        signal: LevelSignal,
    },
}

/// Drives every running sequence on a shared logical clock.
#[derive(Resource, Default)]
pub struct SequenceRunner {
    runs: BTreeMap<RunId, SequenceRun>,
    history: VecDeque<RunSummary>,
    next_id: RunId,
    clock_ms: u64,
    /// Sub-millisecond remainder carried between frames.
    carry_secs: f32,
}

impl SequenceRunner {
    /// Compile and queue a sequence. Compile errors are returned immediately.
    pub fn start(&mut self, sequence: &Sequence, side: usize) -> Result<RunId, BoardError> {
        let program = sequence.compile(side)?;
        self.next_id += 1;
        let id = self.next_id;
        self.runs.insert(
            id,
            SequenceRun {
                id,
                program,
                state: RunState::Idle,
                waited_ms: 0,
                started_at_ms: self.clock_ms,
            },
        );
        Ok(id)
    }

    /// Stop a run. A pending wait is discarded; applied steps stay applied.
    pub fn cancel(&mut self, id: RunId) -> bool {
        let Some(mut run) = self.runs.remove(&id) else {
            return false;
        };
        run.state = RunState::Cancelled;
        run.waited_ms = 0;
        self.archive(&run);
        true
    }

    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<RunId> = self.runs.keys().copied().collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    pub fn get(&self, id: RunId) -> Option<&SequenceRun> {
        self.runs.get(&id)
    }

    pub fn active_count(&self) -> usize {
        self.runs.len()
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Active runs followed by recently finished ones.
    pub fn summaries(&self) -> Vec<RunSummary> {
        self.runs
            .values()
            .map(SequenceRun::summary)
            .chain(self.history.iter().rev().cloned())
            .collect()
    }

    pub fn finished(&self, id: RunId) -> Option<&RunSummary> {
        self.history.iter().find(|s| s.id == id)
    }

    fn archive(&mut self, run: &SequenceRun) {
        self.history.push_back(run.summary());
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// Advance from frame time in seconds, keeping fractional milliseconds.
    pub fn tick_secs(&mut self, dt_secs: f32, target: &mut dyn MutationTarget) -> Vec<RunEvent> {
        let total = self.carry_secs + dt_secs.max(0.0);
        let whole_ms = (total * 1000.0).floor();
        self.carry_secs = total - whole_ms / 1000.0;
        self.tick(whole_ms as u32, target)
    }

    /// Advance every run by `dt_ms` of logical time. Steps from all runs are
    /// applied in the order they come due, so when two runs write one cell the
    /// later step wins. Ties go to the earlier-started run. A level signal
    /// stops the tick.
    pub fn tick(&mut self, dt_ms: u32, target: &mut dyn MutationTarget) -> Vec<RunEvent> {
        self.clock_ms += dt_ms as u64;
        let mut events = Vec::new();
        // offset into this tick each run has reached
        let mut reached: BTreeMap<RunId, u32> = self.runs.keys().map(|id| (*id, 0)).collect();

        while let Some((due, id)) = self.next_due(&reached).filter(|(due, _)| *due <= dt_ms) {
            let Some(run) = self.runs.get_mut(&id) else {
                break;
            };
            reached.insert(id, due);
            let signalled = step_run(run, target, &mut events);
            if run.state.is_finished() {
                reached.remove(&id);
                if let Some(done) = self.runs.remove(&id) {
                    self.archive(&done);
                }
            }
            if signalled {
                return events;
            }
        }

        for (id, at) in reached {
            let Some(run) = self.runs.get_mut(&id) else {
                continue;
            };
            if run.state == RunState::Idle {
                run.state = RunState::Running { cursor: 0 };
            }
            if run.current_op().and_then(Op::delay_ms).is_some() {
                run.waited_ms += dt_ms - at;
            }
        }
        events
    }

    /// Earliest (tick offset, run) at which some run's next op completes.
    fn next_due(&self, reached: &BTreeMap<RunId, u32>) -> Option<(u32, RunId)> {
        reached
            .iter()
            .filter_map(|(id, at)| {
                let run = self.runs.get(id)?;
                Some((at.saturating_add(run.pending_ms()), *id))
            })
            .min()
    }
}

impl SequenceRun {
    fn cursor(&self) -> usize {
        match self.state {
            RunState::Running { cursor } => cursor,
            _ => 0,
        }
    }

    fn current_op(&self) -> Option<&Op> {
        self.program.ops.get(self.cursor())
    }

    /// Time left before the current op completes.
    fn pending_ms(&self) -> u32 {
        self.current_op()
            .and_then(Op::delay_ms)
            .map_or(0, |delay| delay.saturating_sub(self.waited_ms))
    }
}

/// Complete the run's current op. Returns true if it raised a level signal.
fn step_run(
    run: &mut SequenceRun,
    target: &mut dyn MutationTarget,
    events: &mut Vec<RunEvent>,
) -> bool {
    let cursor = run.cursor();
    run.state = RunState::Running { cursor };
    let Some(op) = run.program.ops.get(cursor) else {
        run.state = RunState::Completed;
        events.push(RunEvent::Completed { run: run.id });
        return false;
    };

    if op.delay_ms().is_some() {
        run.waited_ms = 0;
        let kind = match op {
            Op::Gap { .. } => "gap",
            Op::Step { .. } => "wait",
        };
        events.push(RunEvent::Step {
            run: run.id,
            cursor,
            kind,
            origin: op.origin(),
        });
        run.state = RunState::Running { cursor: cursor + 1 };
        return false;
    }
    let Op::Step { step, source, pass } = op else {
        return false;
    };

    match apply_step(step, target) {
        Err(error) => {
            run.state = RunState::Failed {
                error: error.to_string(),
            };
            events.push(RunEvent::Failed { run: run.id, error });
            false
        }
        Ok(signal) => {
            events.push(RunEvent::Step {
                run: run.id,
                cursor,
                kind: step.kind(),
                origin: Some((*source, *pass)),
            });
            match signal {
                Some(signal) => {
                    run.state = RunState::Completed;
                    events.push(RunEvent::Signal { run: run.id, signal });
                    events.push(RunEvent::Completed { run: run.id });
                    true
                }
                None => {
                    run.state = RunState::Running { cursor: cursor + 1 };
                    false
                }
            }
        }
    }
}

fn apply_step(
    step: &SequenceStep,
    target: &mut dyn MutationTarget,
) -> Result<Option<LevelSignal>, BoardError> {
    match step {
        SequenceStep::Paint { index, background } => target.paint(*index, background)?,
        SequenceStep::Erase { index } => target.erase(*index)?,
        SequenceStep::Spawn { index, emoji } => target.spawn(*index, emoji)?,
        SequenceStep::Destroy { index } => target.destroy(*index)?,
        SequenceStep::AddToPlayerInventory { .. } => {
            if let Some(item) = step.inventory_item() {
                target.add_to_player_inventory(item)?;
            }
        }
        SequenceStep::TeleportPlayerTo { index } => target.teleport_player_to(*index)?,
        SequenceStep::ChangePlayerTo { emoji } => target.change_player_to(emoji)?,
        SequenceStep::AddToPlayerHp { points } => target.add_to_player_hp(*points)?,
        SequenceStep::ResetLevel => return Ok(Some(LevelSignal::Reset)),
        SequenceStep::CompleteLevel => return Ok(Some(LevelSignal::Complete)),
        // delays are consumed by the caller
        SequenceStep::Wait { .. } => {}
    }
    Ok(None)
}

/// Start the sequence stored under `event_key` and announce it on the bus.
pub fn start_event(
    runner: &mut SequenceRunner,
    events: &KeyedStore<Sequence>,
    bus: &mut GameEventBus,
    event_key: &str,
    side: usize,
) -> Result<RunId, BoardError> {
    let sequence = events
        .get(event_key)
        .ok_or_else(|| BoardError::config(format!("event '{event_key}' is not defined")))?;
    let id = runner.start(sequence, side)?;
    bus.emit(
        "sequence_started",
        serde_json::json!({ "run": id, "event": event_key, "name": sequence.name }),
        None,
    );
    Ok(id)
}

fn tick_sequences(
    mut runner: ResMut<SequenceRunner>,
    mut map: ResMut<EditableMap>,
    mut player: ResMut<PlayerState>,
    mut health: ResMut<ItemHealth>,
    controllables: Res<KeyedStore<Controllable>>,
    mut bus: ResMut<GameEventBus>,
    time: Res<Time>,
) {
    if runner.active_count() == 0 {
        return;
    }
    let events = {
        let mut world = PlayWorld {
            map: &mut *map,
            player: &mut *player,
            health: &mut *health,
            controllables: &*controllables,
        };
        runner.tick_secs(time.delta_secs(), &mut world)
    };

    for ev in events {
        match ev {
            RunEvent::Step {
                run,
                cursor,
                kind,
                origin,
            } => {
                let (step, pass) = origin.unzip();
                bus.emit(
                    "sequence_step",
                    serde_json::json!({
                        "run": run,
                        "cursor": cursor,
                        "kind": kind,
                        "step": step,
                        "pass": pass,
                    }),
                    None,
                );
            }
            RunEvent::Completed { run } => {
                bus.emit("sequence_completed", serde_json::json!({ "run": run }), None);
            }
            RunEvent::Failed { run, error } => {
                warn!("[Emojiboard sequences] Run {} failed: {}", run, error);
                bus.emit(
                    "sequence_failed",
                    serde_json::json!({ "run": run, "error": error.to_string() }),
                    None,
                );
            }
            RunEvent::Signal { run, signal } => {
                let name = match signal {
                    LevelSignal::Reset => "level_reset",
                    LevelSignal::Complete => "level_complete",
                };
                bus.emit(name, serde_json::json!({ "run": run }), None);
            }
        }
    }
}

/// Cancel everything in flight, announcing each run.
pub fn cancel_all_runs(runner: &mut SequenceRunner, bus: &mut GameEventBus) {
    let ids: Vec<RunId> = runner.runs.keys().copied().collect();
    for id in ids {
        if runner.cancel(id) {
            bus.emit("sequence_cancelled", serde_json::json!({ "run": id }), None);
        }
    }
}

/// Board side length for compiling sequences.
pub fn board_side(config: &BoardConfig, map: &EditableMap) -> usize {
    if map.side_length > 0 {
        map.side_length
    } else {
        config.side_length
    }
}
