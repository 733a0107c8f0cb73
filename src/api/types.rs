use serde::{Deserialize, Serialize};

use crate::collisions::CollisionType;
use crate::error::BoardError;
use crate::game_runtime::RuntimeStateSnapshot;
use crate::entities::EntityDef;
use crate::player::{Direction, PlayerState};
use crate::sequence::{Sequence, SequenceItem, SequenceLoop};

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }

    pub fn from_result(result: Result<T, String>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> ApiResponse<String> {
        ApiResponse {
            ok: true,
            data: Some("ok".to_string()),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> ApiResponse<String> {
        ApiResponse {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// === Map editing ===

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MapEdit {
    Paint { index: i32, background: String },
    Erase { index: i32 },
    Spawn { index: i32, emoji: String },
    Destroy { index: i32 },
    Tint { index: i32, color: String },
}

#[derive(Deserialize)]
pub struct PaintRequest {
    pub index: i32,
    pub background: String,
}

#[derive(Deserialize)]
pub struct IndexRequest {
    pub index: i32,
}

#[derive(Deserialize)]
pub struct SpawnRequest {
    pub index: i32,
    pub emoji: String,
}

#[derive(Deserialize)]
pub struct TintRequest {
    pub index: i32,
    /// Empty clears the tint.
    #[serde(default)]
    pub color: String,
}

// === Editor palette ===

#[derive(Deserialize, Clone, Debug)]
pub struct PaletteRequest {
    pub color: String,
    #[serde(default)]
    pub remove: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StaticRequest {
    pub emoji: String,
    #[serde(default = "default_true")]
    pub add: bool,
}

fn default_true() -> bool {
    true
}

// === Collisions ===

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CollisionRequest {
    pub a: String,
    pub b: String,
    #[serde(rename = "type")]
    pub kind: CollisionType,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CollisionPairRequest {
    pub a: String,
    pub b: String,
}

// === Events & sequences ===

/// A sequence sent by a client. Steps stay as raw records until
/// [`EventRequest::into_sequence`], so an unknown kind is reported as a
/// configuration error rather than a body rejection.
#[derive(Deserialize, Clone, Debug)]
pub struct EventRequest {
    pub name: String,
    #[serde(default, alias = "sequence")]
    pub items: Vec<SequenceItem>,
    #[serde(default, rename = "loop")]
    pub repeat: Option<SequenceLoop>,
}

impl EventRequest {
    pub fn into_sequence(self) -> Result<Sequence, BoardError> {
        let sequence = Sequence::from_items(self.name, self.items)?;
        Ok(Sequence {
            repeat: self.repeat,
            ..sequence
        })
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct PlaySequenceRequest {
    /// Key of a stored event.
    #[serde(default)]
    pub event: Option<String>,
    /// Ad-hoc sequence that is run without being stored.
    #[serde(default)]
    pub sequence: Option<EventRequest>,
}

#[derive(Serialize, Clone, Debug)]
pub struct PlaySequenceResponse {
    pub run: u64,
}

// === Player ===

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct PlayerInputRequest {
    pub direction: Direction,
}

#[derive(Serialize, Clone, Debug)]
pub struct PlayerView {
    #[serde(flatten)]
    pub state: PlayerState,
    pub entity: EntityDef,
    pub held: Vec<String>,
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct SlotRequest {
    pub slot: usize,
}

// === Runtime & level ===

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct RuntimeRequest {
    pub action: crate::game_runtime::RuntimeAction,
}

pub type RuntimeView = RuntimeStateSnapshot;

#[derive(Deserialize, Default)]
pub struct LevelPathRequest {
    /// Overrides the configured level path.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct LevelLoadResult {
    pub path: String,
    pub events: usize,
    pub interactables: usize,
    pub flow_nodes: usize,
}

#[derive(Deserialize, Default)]
pub struct BusQuery {
    #[serde(default)]
    pub since: Option<u64>,
}
