pub const DEFAULT_SIDE_LENGTH: usize = 12;
pub const DEFAULT_BG: &str = "#E6E6E6";

/// Largest board a level or `board.json` may ask for.
pub const MAX_SIDE_LENGTH: usize = 64;

pub const MIN_DURATION: u32 = 50;
pub const MAX_DURATION: u32 = 10_000;

pub const MIN_ITERATION: u32 = 1;
pub const MAX_ITERATION: u32 = DEFAULT_SIDE_LENGTH as u32;

pub const MAX_INVENTORY_SIZE: usize = 4;

/* FLOW NODES */
pub const CONTAINER_W: f32 = 400.0;
pub const CONTAINER_H: f32 = 600.0;
pub const CONTAINER_BG: &str = "#eef2ff";
pub const CONTAINER_BORDER: &str = "#6366f1";

pub const CONDITION_W: f32 = 240.0;
pub const CONDITION_H: f32 = 90.0;
pub const CONDITION_BG: &str = "#f8fafc";
pub const CONDITION_BORDER: &str = "#334155";

pub const EVENT_W: f32 = 180.0;
pub const EVENT_H: f32 = 90.0;
pub const EVENT_BG: &str = "#fff7ed";
pub const EVENT_BORDER: &str = "#f97316";

pub const SPAWNER_W: f32 = 180.0;
pub const SPAWNER_H: f32 = 90.0;
pub const SPAWNER_BG: &str = "#f0fdf4";
pub const SPAWNER_BORDER: &str = "#22c55e";

pub const DEFAULT_API_PORT: u16 = 3100;
