use std::path::PathBuf;

use crate::game::GameState;

/// Errors produced by the simulation core
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("unknown direction value: {0}")]
    UnknownDirection(u8),

    #[error("unknown action index: {0}")]
    UnknownActionIndex(usize),

    #[error("unknown direction name: {0:?}")]
    InvalidDirectionName(String),

    #[error("invalid game configuration: {0}")]
    InvalidConfig(String),

    #[error("no free cell left for food in a {width}x{height} arena")]
    NoFreeCell { width: usize, height: usize },

    #[error("cannot start a game that is {from:?}")]
    InvalidTransition { from: GameState },

    #[error("the tick loop needs a running Tokio runtime")]
    NoRuntime,

    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type GameResult<T> = Result<T, GameError>;
