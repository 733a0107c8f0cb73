use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::components::BoardConfig;
use crate::constants::{DEFAULT_BG, DEFAULT_SIDE_LENGTH, MAX_SIDE_LENGTH};
use crate::error::BoardError;

/// Cell count of a board with `side` cells per row, if `side` is usable.
pub fn checked_cell_count(side: usize) -> Result<usize, BoardError> {
    if side == 0 || side > MAX_SIDE_LENGTH {
        return Err(BoardError::config(format!(
            "side length {side} outside [1, {MAX_SIDE_LENGTH}]"
        )));
    }
    Ok(side * side)
}

/// `{row}_{col}` address of one board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    pub row: usize,
    pub col: usize,
}

impl CellId {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn from_index(index: i32, side: usize) -> Result<Self, BoardError> {
        let cells = side.saturating_mul(side);
        if index < 0 || index as usize >= cells {
            return Err(BoardError::Bounds {
                index: index as i64,
                cells,
            });
        }
        let index = index as usize;
        Ok(Self {
            row: index / side,
            col: index % side,
        })
    }

    pub fn index(&self, side: usize) -> usize {
        self.row * side + self.col
    }

    pub fn in_bounds(&self, side: usize) -> bool {
        self.row < side && self.col < side
    }

    /// Neighbour one step away, `None` when it would leave the board.
    pub fn offset(&self, d_row: i32, d_col: i32, side: usize) -> Option<CellId> {
        let row = self.row as i64 + d_row as i64;
        let col = self.col as i64 + d_col as i64;
        if row < 0 || col < 0 || row >= side as i64 || col >= side as i64 {
            return None;
        }
        Some(CellId::new(row as usize, col as usize))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.col)
    }
}

impl FromStr for CellId {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('_')
            .ok_or_else(|| BoardError::InvalidCell(s.to_string()))?;
        let row = row
            .parse::<usize>()
            .map_err(|_| BoardError::InvalidCell(s.to_string()))?;
        let col = col
            .parse::<usize>()
            .map_err(|_| BoardError::InvalidCell(s.to_string()))?;
        Ok(CellId { row, col })
    }
}

impl Serialize for CellId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The authoritative editable level grid.
#[derive(bevy::prelude::Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableMap {
    #[serde(default)]
    pub starting_section_index: usize,
    #[serde(default = "default_side")]
    pub side_length: usize,
    #[serde(default)]
    pub items: BTreeMap<CellId, String>,
    #[serde(default)]
    pub colors: BTreeMap<CellId, String>,
    #[serde(default)]
    pub backgrounds: BTreeMap<CellId, String>,
    /// Background shown for unpainted cells.
    #[serde(default = "default_dbg")]
    pub dbg: String,
}

fn default_side() -> usize {
    DEFAULT_SIDE_LENGTH
}

fn default_dbg() -> String {
    DEFAULT_BG.to_string()
}

impl Default for EditableMap {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE_LENGTH, DEFAULT_BG)
    }
}

impl EditableMap {
    pub fn new(side_length: usize, dbg: impl Into<String>) -> Self {
        Self {
            starting_section_index: 0,
            side_length,
            items: BTreeMap::new(),
            colors: BTreeMap::new(),
            backgrounds: BTreeMap::new(),
            dbg: dbg.into(),
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(config.side_length, config.default_background.clone())
    }

    pub fn cell_count(&self) -> usize {
        self.side_length.saturating_mul(self.side_length)
    }

    pub fn cell(&self, index: i32) -> Result<CellId, BoardError> {
        CellId::from_index(index, self.side_length)
    }

    pub fn check(&self, cell: CellId) -> Result<CellId, BoardError> {
        if cell.in_bounds(self.side_length) {
            Ok(cell)
        } else {
            Err(BoardError::Bounds {
                index: cell.index(self.side_length) as i64,
                cells: self.cell_count(),
            })
        }
    }

    pub fn paint(&mut self, index: i32, background: &str) -> Result<(), BoardError> {
        let cell = self.cell(index)?;
        self.backgrounds.insert(cell, background.to_string());
        Ok(())
    }

    pub fn erase(&mut self, index: i32) -> Result<(), BoardError> {
        let cell = self.cell(index)?;
        self.backgrounds.remove(&cell);
        Ok(())
    }

    pub fn spawn(&mut self, index: i32, emoji: &str) -> Result<(), BoardError> {
        let cell = self.cell(index)?;
        self.place(cell, emoji)
    }

    pub fn destroy(&mut self, index: i32) -> Result<(), BoardError> {
        let cell = self.cell(index)?;
        self.items.remove(&cell);
        Ok(())
    }

    pub fn place(&mut self, cell: CellId, emoji: &str) -> Result<(), BoardError> {
        let cell = self.check(cell)?;
        if emoji.is_empty() {
            self.items.remove(&cell);
        } else {
            self.items.insert(cell, emoji.to_string());
        }
        Ok(())
    }

    pub fn take(&mut self, cell: CellId) -> Option<String> {
        self.items.remove(&cell)
    }

    pub fn set_color(&mut self, cell: CellId, color: &str) -> Result<(), BoardError> {
        let cell = self.check(cell)?;
        if color.is_empty() {
            self.colors.remove(&cell);
        } else {
            self.colors.insert(cell, color.to_string());
        }
        Ok(())
    }

    pub fn item_at(&self, cell: CellId) -> Option<&str> {
        self.items.get(&cell).map(String::as_str)
    }

    pub fn background_at(&self, cell: CellId) -> &str {
        self.backgrounds
            .get(&cell)
            .map(String::as_str)
            .unwrap_or(&self.dbg)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.colors.clear();
        self.backgrounds.clear();
    }
}

/// Map shape written by the first editor release: linear indices instead of
/// cell ids, items stored with their own index, and an objective string.
#[derive(Clone, Debug, Deserialize)]
pub struct LegacyEditableMap {
    #[serde(default)]
    pub items: BTreeMap<String, LegacyEmoji>,
    #[serde(default)]
    pub backgrounds: BTreeMap<String, String>,
    #[serde(default)]
    pub objective: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LegacyEmoji {
    pub index: i32,
    pub emoji: String,
}

impl LegacyEditableMap {
    /// Convert to the canonical map. Any out-of-board index rejects the whole map.
    pub fn migrate(self, side_length: usize) -> Result<EditableMap, BoardError> {
        let mut map = EditableMap::new(side_length, DEFAULT_BG);
        for item in self.items.into_values() {
            map.spawn(item.index, &item.emoji)?;
        }
        for (key, color) in self.backgrounds {
            let index = key
                .parse::<i32>()
                .map_err(|_| BoardError::InvalidCell(key.clone()))?;
            map.paint(index, &color)?;
        }
        Ok(map)
    }
}
