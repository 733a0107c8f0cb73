use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collisions::{CollisionTable, CollisionType};
use crate::components::BoardConfig;
use crate::entities::{Condition, Controllable, EntityDef, Hp, Interactable, SideEffectMagnitude};
use crate::error::BoardError;
use crate::events::GameEventBus;
use crate::flow_graph::FlowGraph;
use crate::game_runtime::PlayPhase;
use crate::grid::{CellId, EditableMap};
use crate::input::VirtualInput;
use crate::interpreter::{board_side, start_event, MutationTarget, SequenceRunner};
use crate::inventory::{Effector, PlayerInventory};
use crate::sequence::Sequence;
use crate::store::{KeyedStore, Statics};

pub const DEFAULT_PLAYER_EMOJI: &str = "🙂";
pub const DEFAULT_PLAYER_HP: i32 = 3;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        let capacity = app
            .world()
            .get_resource::<BoardConfig>()
            .map(|c| c.max_inventory_size)
            .unwrap_or(crate::constants::MAX_INVENTORY_SIZE);
        app.insert_resource(PlayerState::with_capacity(capacity))
            .insert_resource(ItemHealth::default())
            .add_systems(Update, move_player.run_if(in_state(PlayPhase::Playing)));
    }
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub cell: CellId,
    pub emoji: String,
    pub hp: Hp,
    pub inventory: PlayerInventory,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::with_capacity(crate::constants::MAX_INVENTORY_SIZE)
    }
}

impl PlayerState {
    /// The player as a board entity: its glyph, held items and hp.
    pub fn as_entity(&self) -> EntityDef {
        EntityDef {
            // depleted hp still shows, unlike a definition with zero points
            hp: Some(self.hp),
            ..EntityDef::new(self.emoji.clone(), Some(self.inventory.as_map()), None)
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cell: CellId::new(0, 0),
            emoji: DEFAULT_PLAYER_EMOJI.to_string(),
            hp: Hp::new(DEFAULT_PLAYER_HP),
            inventory: PlayerInventory::with_capacity(capacity),
        }
    }
}

/// Remaining hp of interactables that have been struck at least once, by cell.
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemHealth(pub BTreeMap<CellId, i32>);

/// The board plus the player, as seen by sequence steps during play.
pub struct PlayWorld<'a> {
    pub map: &'a mut EditableMap,
    pub player: &'a mut PlayerState,
    pub health: &'a mut ItemHealth,
    pub controllables: &'a KeyedStore<Controllable>,
}

impl PlayWorld<'_> {
    fn controllable(&self, emoji: &str) -> Option<&Controllable> {
        self.controllables
            .iter()
            .map(|(_, c)| c)
            .find(|c| c.emoji == emoji)
    }
}

impl MutationTarget for PlayWorld<'_> {
    fn paint(&mut self, index: i32, background: &str) -> Result<(), BoardError> {
        self.map.paint(index, background)
    }

    fn erase(&mut self, index: i32) -> Result<(), BoardError> {
        self.map.erase(index)
    }

    // a new or removed item does not inherit the old one's wear
    fn spawn(&mut self, index: i32, emoji: &str) -> Result<(), BoardError> {
        self.map.spawn(index, emoji)?;
        self.health.0.remove(&self.map.cell(index)?);
        Ok(())
    }

    fn destroy(&mut self, index: i32) -> Result<(), BoardError> {
        self.map.destroy(index)?;
        self.health.0.remove(&self.map.cell(index)?);
        Ok(())
    }

    fn add_to_player_inventory(&mut self, item: Effector) -> Result<(), BoardError> {
        self.player.inventory.add_item(item).map(|_| ())
    }

    fn teleport_player_to(&mut self, index: i32) -> Result<(), BoardError> {
        self.player.cell = self.map.cell(index)?;
        Ok(())
    }

    fn change_player_to(&mut self, emoji: &str) -> Result<(), BoardError> {
        if emoji.is_empty() {
            return Err(BoardError::config("cannot change the player into nothing"));
        }
        let hp = self.controllable(emoji).map(|c| Hp::new(c.hp));
        self.player.emoji = emoji.to_string();
        if let Some(hp) = hp {
            self.player.hp = hp;
        }
        Ok(())
    }

    fn add_to_player_hp(&mut self, points: i32) -> Result<(), BoardError> {
        self.player.hp.add(points);
        let next = self
            .controllable(&self.player.emoji)
            .and_then(|c| c.transform_for(&self.player.hp))
            .map(str::to_string);
        if let Some(next) = next {
            self.player.emoji = next;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn action(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// (row, col) step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// Read-only level rules consulted by a move.
pub struct Rules<'a> {
    pub collisions: &'a CollisionTable,
    pub interactables: &'a KeyedStore<Interactable>,
    pub conditions: &'a KeyedStore<Condition>,
    pub flow: &'a FlowGraph,
    pub statics: &'a Statics,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved { to: CellId },
    Pushed { to: CellId, item: String },
    Blocked,
    Collided { item: String, tag: String },
    Interacted {
        item: String,
        hp: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        became: Option<String>,
    },
}

/// Result of one step of the player, plus the follow-ups the caller runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    #[serde(flatten)]
    pub outcome: MoveOutcome,
    /// Event store keys to start, in firing order.
    pub events: Vec<String>,
    /// Interactables that talked back.
    pub talk: Vec<String>,
    /// Sequence carried by a struck interactable, started after the events.
    #[serde(skip)]
    pub interaction: Option<Sequence>,
}

impl MoveReport {
    fn new(outcome: MoveOutcome) -> Self {
        Self {
            outcome,
            events: Vec::new(),
            talk: Vec::new(),
            interaction: None,
        }
    }
}

/// Move the player one cell and resolve whatever is in the way.
pub fn step_player(
    world: &mut PlayWorld,
    rules: &Rules,
    direction: Direction,
) -> Result<MoveReport, BoardError> {
    let side = world.map.side_length;
    let (d_row, d_col) = direction.delta();
    let Some(target) = world.player.cell.offset(d_row, d_col, side) else {
        return Ok(MoveReport::new(MoveOutcome::Blocked));
    };
    let Some(item) = world.map.item_at(target).map(str::to_string) else {
        world.player.cell = target;
        return Ok(MoveReport::new(MoveOutcome::Moved { to: target }));
    };

    let mut events = bump_events(rules, &world.player.emoji, &item);
    if rules.statics.contains(&item) {
        let mut report = MoveReport::new(MoveOutcome::Blocked);
        report.events = events;
        return Ok(report);
    }

    let interactable = rules
        .interactables
        .iter()
        .map(|(_, i)| i)
        .find(|i| i.emoji == item);
    let mut report = if let Some(def) = interactable {
        interact(world, def, target)?
    } else {
        match rules.collisions.lookup(&world.player.emoji, &item) {
            Some(CollisionType::Push) => {
                let beyond = target
                    .offset(d_row, d_col, side)
                    .filter(|c| world.map.item_at(*c).is_none() && *c != world.player.cell);
                match beyond {
                    Some(beyond) => {
                        world.map.take(target);
                        world.map.place(beyond, &item)?;
                        if let Some(hp) = world.health.0.remove(&target) {
                            world.health.0.insert(beyond, hp);
                        }
                        world.player.cell = target;
                        MoveReport::new(MoveOutcome::Pushed { to: beyond, item })
                    }
                    None => MoveReport::new(MoveOutcome::Blocked),
                }
            }
            Some(CollisionType::Custom(tag)) => MoveReport::new(MoveOutcome::Collided {
                item,
                tag: tag.clone(),
            }),
            Some(CollisionType::Bump) | None => MoveReport::new(MoveOutcome::Blocked),
        }
    };

    events.append(&mut report.events);
    report.events = events;
    Ok(report)
}

/// Events fired by conditions on `a` bumping `b`, including those reached
/// through the flow graph.
fn bump_events(rules: &Rules, a: &str, b: &str) -> Vec<String> {
    let mut events = Vec::new();
    for (key, condition) in rules.conditions.iter() {
        if !condition.matches(a, b) {
            continue;
        }
        events.push(condition.event_id.clone());
        events.extend(rules.flow.events_triggered_by(key));
    }
    let mut seen = std::collections::HashSet::new();
    events.retain(|e| seen.insert(e.clone()));
    events
}

/// Strike an interactable: queue its sequence, apply side effects, then take
/// one hp off it and apply evolve/devolve/drops.
fn interact(
    world: &mut PlayWorld,
    def: &Interactable,
    cell: CellId,
) -> Result<MoveReport, BoardError> {
    let mut report = MoveReport::new(MoveOutcome::Blocked);
    if !def.sequence.is_empty() {
        report.interaction = Some(Sequence::new(def.emoji.clone(), def.sequence.clone()));
    }
    for effect in &def.side_effects {
        match &effect.1 {
            SideEffectMagnitude::Talk => report.talk.push(def.emoji.clone()),
            SideEffectMagnitude::Points(points) if effect.0.matches(&world.player.emoji) => {
                world.add_to_player_hp(*points)?;
            }
            SideEffectMagnitude::Points(_) => {}
        }
    }

    let hp = world.health.0.entry(cell).or_insert(def.hp);
    *hp -= 1;
    let left = *hp;
    let mut became = None;

    if left <= 0 {
        world.health.0.remove(&cell);
        if def.devolve.is_set() {
            world.map.place(cell, &def.devolve.to)?;
            became = Some(def.devolve.to.clone());
        } else {
            world.map.take(cell);
        }
        if let Some(drop) = def.drops.item() {
            // a full inventory leaves the drop on the board
            if world.player.inventory.add_item(drop.clone()).is_err()
                && world.map.item_at(cell).is_none()
            {
                world.map.place(cell, &drop.emoji)?;
                became = Some(drop.emoji);
            }
        }
    } else if def.evolve.is_set() && left <= def.evolve.at {
        world.map.place(cell, &def.evolve.to)?;
        became = Some(def.evolve.to.clone());
    }

    report.outcome = MoveOutcome::Interacted {
        item: def.emoji.clone(),
        hp: left,
        became,
    };
    Ok(report)
}

#[derive(SystemParam)]
pub struct LevelRules<'w> {
    pub collisions: Res<'w, CollisionTable>,
    pub interactables: Res<'w, KeyedStore<Interactable>>,
    pub conditions: Res<'w, KeyedStore<Condition>>,
    pub controllables: Res<'w, KeyedStore<Controllable>>,
    pub flow: Res<'w, FlowGraph>,
    pub statics: Res<'w, Statics>,
    pub events: Res<'w, KeyedStore<Sequence>>,
}

impl LevelRules<'_> {
    pub fn rules(&self) -> Rules<'_> {
        Rules {
            collisions: &self.collisions,
            interactables: &self.interactables,
            conditions: &self.conditions,
            flow: &self.flow,
            statics: &self.statics,
        }
    }
}

/// Apply one move and start the events it fired. Shared by keyboard input
/// and the API.
#[allow(clippy::too_many_arguments)]
pub fn perform_move(
    direction: Direction,
    mut world: PlayWorld,
    rules: &Rules,
    events: &KeyedStore<Sequence>,
    runner: &mut SequenceRunner,
    bus: &mut GameEventBus,
    side: usize,
) -> Result<MoveReport, BoardError> {
    let report = step_player(&mut world, rules, direction)?;
    let here = Some(world.player.cell.to_string());

    match &report.outcome {
        MoveOutcome::Collided { item, tag } => bus.emit(
            "collision",
            serde_json::json!({ "a": world.player.emoji, "b": item, "type": tag }),
            here,
        ),
        MoveOutcome::Interacted { item, hp, became } => bus.emit(
            "interaction",
            serde_json::json!({ "item": item, "hp": hp, "became": became }),
            here,
        ),
        _ => {}
    }
    for emoji in &report.talk {
        bus.emit("talk", serde_json::json!({ "emoji": emoji }), None);
    }
    for event in &report.events {
        if let Err(e) = start_event(runner, events, bus, event, side) {
            warn!("[Emojiboard play] Could not start event '{}': {}", event, e);
        }
    }
    if let Some(sequence) = &report.interaction {
        match runner.start(sequence, side) {
            Ok(run) => bus.emit(
                "sequence_started",
                serde_json::json!({ "run": run, "interactable": sequence.name }),
                None,
            ),
            Err(e) => warn!(
                "[Emojiboard play] Could not start sequence of '{}': {}",
                sequence.name, e
            ),
        }
    }
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn move_player(
    input: Res<VirtualInput>,
    config: Res<BoardConfig>,
    mut map: ResMut<EditableMap>,
    mut player: ResMut<PlayerState>,
    mut health: ResMut<ItemHealth>,
    level: LevelRules,
    mut runner: ResMut<SequenceRunner>,
    mut bus: ResMut<GameEventBus>,
) {
    let Some(direction) = Direction::ALL
        .into_iter()
        .find(|d| input.just_pressed(d.action()))
    else {
        return;
    };
    let side = board_side(&config, &map);
    let world = PlayWorld {
        map: &mut map,
        player: &mut player,
        health: &mut health,
        controllables: &level.controllables,
    };
    if let Err(e) = perform_move(
        direction,
        world,
        &level.rules(),
        &level.events,
        &mut runner,
        &mut bus,
        side,
    ) {
        warn!("[Emojiboard play] Move {:?} failed: {}", direction, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Devolve, Drops, Evolve, SideEffect, SideEffectTarget};
    use crate::flow_graph::{FlowEdge, FlowNode, NodeKind, XyPosition};
    use crate::sequence::SequenceStep;

    struct Fixture {
        map: EditableMap,
        player: PlayerState,
        health: ItemHealth,
        collisions: CollisionTable,
        interactables: KeyedStore<Interactable>,
        conditions: KeyedStore<Condition>,
        controllables: KeyedStore<Controllable>,
        flow: FlowGraph,
        statics: Statics,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                map: EditableMap::default(),
                player: PlayerState::default(),
                health: ItemHealth::default(),
                collisions: CollisionTable::default(),
                interactables: KeyedStore::default(),
                conditions: KeyedStore::default(),
                controllables: KeyedStore::default(),
                flow: FlowGraph::default(),
                statics: Statics::default(),
            }
        }

        fn step(&mut self, direction: Direction) -> MoveReport {
            let rules = Rules {
                collisions: &self.collisions,
                interactables: &self.interactables,
                conditions: &self.conditions,
                flow: &self.flow,
                statics: &self.statics,
            };
            let mut world = PlayWorld {
                map: &mut self.map,
                player: &mut self.player,
                health: &mut self.health,
                controllables: &self.controllables,
            };
            step_player(&mut world, &rules, direction).unwrap()
        }
    }

    fn rock() -> Interactable {
        Interactable {
            emoji: "🪨".into(),
            sequence: vec![SequenceStep::Paint {
                index: 0,
                background: "#777777".into(),
            }],
            legacy_event: None,
            hp: 3,
            side_effects: vec![SideEffect(
                SideEffectTarget::Any,
                SideEffectMagnitude::Points(-1),
            )],
            evolve: Evolve {
                to: "🧱".into(),
                at: 1,
            },
            devolve: Devolve::default(),
            drops: Drops("💎".into(), 2),
        }
    }

    #[test]
    fn moves_into_empty_cells_and_stops_at_edges() {
        let mut f = Fixture::new();
        assert_eq!(f.step(Direction::Up).outcome, MoveOutcome::Blocked);
        assert_eq!(
            f.step(Direction::Right).outcome,
            MoveOutcome::Moved {
                to: CellId::new(0, 1)
            }
        );
        assert_eq!(f.player.cell, CellId::new(0, 1));
    }

    #[test]
    fn unknown_item_blocks_like_bump() {
        let mut f = Fixture::new();
        f.map.place(CellId::new(0, 1), "🌳").unwrap();
        assert_eq!(f.step(Direction::Right).outcome, MoveOutcome::Blocked);
        assert_eq!(f.player.cell, CellId::new(0, 0));
    }

    #[test]
    fn push_moves_item_when_space_beyond() {
        let mut f = Fixture::new();
        f.collisions.set("🙂", "📦", CollisionType::Push);
        f.map.place(CellId::new(0, 1), "📦").unwrap();
        let out = f.step(Direction::Right).outcome;
        assert_eq!(
            out,
            MoveOutcome::Pushed {
                to: CellId::new(0, 2),
                item: "📦".into()
            }
        );
        assert_eq!(f.map.item_at(CellId::new(0, 2)), Some("📦"));
        assert_eq!(f.map.item_at(CellId::new(0, 1)), None);
        assert_eq!(f.player.cell, CellId::new(0, 1));

        // wall behind the box
        f.map.place(CellId::new(0, 3), "🌳").unwrap();
        assert_eq!(f.step(Direction::Right).outcome, MoveOutcome::Blocked);
        assert_eq!(f.player.cell, CellId::new(0, 1));
    }

    #[test]
    fn push_against_board_edge_is_blocked() {
        let mut f = Fixture::new();
        f.collisions.set("📦", "🙂", CollisionType::Push);
        f.player.cell = CellId::new(0, 10);
        f.map.place(CellId::new(0, 11), "📦").unwrap();
        assert_eq!(f.step(Direction::Right).outcome, MoveOutcome::Blocked);
    }

    #[test]
    fn static_items_neither_push_nor_interact() {
        let mut f = Fixture::new();
        f.collisions.set("🙂", "📦", CollisionType::Push);
        f.statics.toggle("📦", true);
        f.map.place(CellId::new(0, 1), "📦").unwrap();
        assert_eq!(f.step(Direction::Right).outcome, MoveOutcome::Blocked);
        assert_eq!(f.map.item_at(CellId::new(0, 1)), Some("📦"));

        f.interactables.add(rock());
        f.statics.toggle("🪨", true);
        f.map.place(CellId::new(1, 0), "🪨").unwrap();
        let report = f.step(Direction::Down);
        assert_eq!(report.outcome, MoveOutcome::Blocked);
        assert!(report.events.is_empty());
        assert!(f.health.0.is_empty());
    }

    #[test]
    fn custom_collision_reports_tag() {
        let mut f = Fixture::new();
        f.collisions
            .set("🙂", "🔥", CollisionType::Custom("burn".into()));
        f.map.place(CellId::new(1, 0), "🔥").unwrap();
        assert_eq!(
            f.step(Direction::Down).outcome,
            MoveOutcome::Collided {
                item: "🔥".into(),
                tag: "burn".into()
            }
        );
    }

    #[test]
    fn striking_an_interactable_wears_it_down() {
        let mut f = Fixture::new();
        f.interactables.add(rock());
        let cell = CellId::new(0, 1);
        f.map.place(cell, "🪨").unwrap();

        let first = f.step(Direction::Right);
        assert!(first.events.is_empty());
        assert_eq!(first.interaction.as_ref().map(|s| s.steps.len()), Some(1));
        assert_eq!(
            first.outcome,
            MoveOutcome::Interacted {
                item: "🪨".into(),
                hp: 2,
                became: None
            }
        );
        assert_eq!(f.player.hp.current, 2);

        let second = f.step(Direction::Right);
        assert!(matches!(
            second.outcome,
            MoveOutcome::Interacted { hp: 1, became: Some(ref e), .. } if e == "🧱"
        ));
        assert_eq!(f.map.item_at(cell), Some("🧱"));
        assert_eq!(f.health.0.get(&cell), Some(&1));
    }

    #[test]
    fn destroyed_interactable_drops_into_inventory() {
        let mut f = Fixture::new();
        let mut def = rock();
        def.hp = 1;
        def.evolve = Evolve::default();
        f.interactables.add(def);
        f.map.place(CellId::new(0, 1), "🪨").unwrap();

        f.step(Direction::Right);
        assert_eq!(f.map.item_at(CellId::new(0, 1)), None);
        assert!(f.player.inventory.as_map().values().any(|e| e.emoji == "💎"));
        assert!(f.health.0.is_empty());
    }

    #[test]
    fn drop_stays_on_board_when_inventory_full() {
        let mut f = Fixture::new();
        for _ in 0..f.player.inventory.capacity() {
            f.player
                .inventory
                .add_item(Effector::infinite("🗝️"))
                .unwrap();
        }
        let mut def = rock();
        def.hp = 1;
        f.interactables.add(def);
        f.map.place(CellId::new(0, 1), "🪨").unwrap();

        f.step(Direction::Right);
        assert_eq!(f.map.item_at(CellId::new(0, 1)), Some("💎"));
    }

    #[test]
    fn conditions_and_flow_graph_fire_events_on_bump() {
        let mut f = Fixture::new();
        let key = f.conditions.add(Condition {
            a: "🙂".into(),
            b: SideEffectTarget::Any,
            event_id: "open".into(),
        });
        f.flow.add_node(
            FlowNode::new("c", NodeKind::Condition, XyPosition::default())
                .with_reference("bump", key),
        )
        .unwrap();
        f.flow.add_node(
            FlowNode::new("e", NodeKind::Event, XyPosition::new(300.0, 0.0))
                .receiving()
                .with_reference("ring", "bell"),
        )
        .unwrap();
        f.flow.connect(FlowEdge::new("ce", "c", "e")).unwrap();
        f.map.place(CellId::new(1, 0), "🚪").unwrap();

        let report = f.step(Direction::Down);
        assert_eq!(report.outcome, MoveOutcome::Blocked);
        assert_eq!(report.events, vec!["open".to_string(), "bell".to_string()]);
    }

    #[test]
    fn respawned_interactable_starts_with_full_hp() {
        let mut f = Fixture::new();
        f.interactables.add(rock());
        let cell = CellId::new(0, 1);
        f.map.place(cell, "🪨").unwrap();
        f.step(Direction::Right);
        f.step(Direction::Right);
        assert_eq!(f.health.0.get(&cell), Some(&1));

        let mut world = PlayWorld {
            map: &mut f.map,
            player: &mut f.player,
            health: &mut f.health,
            controllables: &f.controllables,
        };
        world.destroy(1).unwrap();
        world.spawn(1, "🪨").unwrap();
        assert!(world.health.0.is_empty());

        let report = f.step(Direction::Right);
        assert!(matches!(
            report.outcome,
            MoveOutcome::Interacted { hp: 2, .. }
        ));
        assert_eq!(f.map.item_at(cell), Some("🪨"));
    }

    #[test]
    fn change_player_to_controllable_resets_hp() {
        let mut f = Fixture::new();
        f.controllables.add(Controllable {
            emoji: "🐛".into(),
            hp: 2,
            side_effects: vec![],
            evolve: Evolve {
                to: "🦋".into(),
                at: 4,
            },
            devolve: Devolve::default(),
        });
        let mut world = PlayWorld {
            map: &mut f.map,
            player: &mut f.player,
            health: &mut f.health,
            controllables: &f.controllables,
        };
        world.change_player_to("🐛").unwrap();
        assert_eq!(world.player.hp, Hp::new(2));
        world.add_to_player_hp(1).unwrap();
        assert_eq!(world.player.emoji, "🐛");
        world.add_to_player_hp(1).unwrap();
        assert_eq!(world.player.emoji, "🦋");
        assert_eq!(world.player.hp.max, 4);
    }

    #[test]
    fn teleport_checks_bounds() {
        let mut f = Fixture::new();
        let mut world = PlayWorld {
            map: &mut f.map,
            player: &mut f.player,
            health: &mut f.health,
            controllables: &f.controllables,
        };
        world.teleport_player_to(13).unwrap();
        assert_eq!(world.player.cell, CellId::new(1, 1));
        assert!(matches!(
            world.teleport_player_to(144),
            Err(BoardError::Bounds { .. })
        ));
    }
}
