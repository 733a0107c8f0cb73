use thiserror::Error;

/// Errors surfaced by board, sequence and flow-graph operations.
///
/// Every variant is fatal to the operation that produced it; nothing here is
/// retried since all operations are local and deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("cell index {index} is outside the board (0..{cells})")]
    Bounds { index: i64, cells: usize },
    #[error("invalid cell id '{0}', expected \"{{row}}_{{col}}\"")]
    InvalidCell(String),
    #[error("edge '{edge}' references missing node '{node}'")]
    Reference { edge: String, node: String },
    #[error("flow graph contains a cycle through '{0}'")]
    Cycle(String),
    #[error("inventory is full ({capacity} slots)")]
    InventoryFull { capacity: usize },
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl BoardError {
    pub fn config(msg: impl Into<String>) -> Self {
        BoardError::Configuration(msg.into())
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for BoardError {
    fn from(e: std::io::Error) -> Self {
        BoardError::Persistence(e.to_string())
    }
}
