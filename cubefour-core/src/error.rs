//! Error types for the game core

use thiserror::Error;

/// Everything the core can reject or fail on
#[derive(Debug, Error)]
pub enum GameError {
    #[error("column ({x}, {z}) is full")]
    ColumnFull { x: u8, z: u8 },

    #[error("column ({x}, {z}) is outside the 4x4 grid")]
    OutOfBounds { x: u8, z: u8 },

    #[error("game is already over")]
    GameOver,

    #[error("unknown bot: {0}")]
    UnknownBot(String),

    #[error("a search request is already in flight")]
    SchedulerBusy,

    #[error("search worker failed: {0}")]
    WorkerFailure(String),

    #[error("search worker is no longer running")]
    WorkerDisconnected,

    #[error("invalid board encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid player index: {0}")]
    InvalidPlayer(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
