use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    /// Strictly increasing across the bus lifetime; readers keep it as a cursor.
    pub seq: u64,
    pub name: String,
    pub data: serde_json::Value,
    pub frame: u64,
    pub source_cell: Option<String>,
}

#[derive(Resource, Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub dropped_events: u64,
    next_seq: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(
        &mut self,
        name: impl Into<String>,
        data: serde_json::Value,
        source_cell: Option<String>,
    ) {
        self.next_seq += 1;
        self.recent.push_back(GameEvent {
            seq: self.next_seq,
            name: name.into(),
            data,
            frame: self.frame,
            source_cell,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame == 0 || self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[Emojiboard events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    /// Events emitted after `seq`, oldest first.
    pub fn since(&self, seq: u64) -> impl Iterator<Item = &GameEvent> {
        // seq is monotonic so the retained tail is sorted
        let start = self.recent.partition_point(|e| e.seq <= seq);
        self.recent.range(start..)
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq
    }
}

pub struct GameEventsPlugin;

impl Plugin for GameEventsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(GameEventBus::default())
            .add_systems(First, tick_event_frame);
    }
}

fn tick_event_frame(mut bus: ResMut<GameEventBus>) {
    bus.frame = bus.frame.saturating_add(1);
}
