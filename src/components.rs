use bevy::prelude::*;

use crate::constants::{DEFAULT_BG, DEFAULT_SIDE_LENGTH, MAX_INVENTORY_SIZE};

/// Whether the app runs without a window.
#[derive(Resource, Clone, Copy, Default)]
pub struct HeadlessMode(pub bool);

/// Board settings (as a resource so a level can override them)
#[derive(Resource, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_side_length")]
    pub side_length: usize,
    #[serde(default = "default_background")]
    pub default_background: String,
    #[serde(default = "default_inventory_size")]
    pub max_inventory_size: usize,
    /// Size of one cell on screen, in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

fn default_side_length() -> usize {
    DEFAULT_SIDE_LENGTH
}

fn default_background() -> String {
    DEFAULT_BG.to_string()
}

fn default_inventory_size() -> usize {
    MAX_INVENTORY_SIZE
}

fn default_cell_size() -> f32 {
    40.0
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            side_length: DEFAULT_SIDE_LENGTH,
            default_background: DEFAULT_BG.to_string(),
            max_inventory_size: MAX_INVENTORY_SIZE,
            cell_size: default_cell_size(),
        }
    }
}

/// Background square of one board cell
#[derive(Component, Clone, Copy)]
pub struct CellTile {
    pub index: usize,
}

/// Emoji glyph drawn on top of a cell
#[derive(Component, Clone, Copy)]
pub struct ItemGlyph {
    pub index: usize,
}

/// Marks the player glyph
#[derive(Component)]
pub struct PlayerGlyph;
