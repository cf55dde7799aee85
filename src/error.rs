// src/error.rs
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::piece::Color;
use crate::session::GameId;

/// Coordinate errors, raised before anything reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("coordinate ({row}, {column}) is off the board")]
    InvalidCoordinate { row: i8, column: i8 },
    #[error("invalid square notation: '{0}'")]
    InvalidNotation(String),
    #[error("invalid move notation: '{0}'. Use a form like 'e2e4' or 'a7a8q'")]
    InvalidMoveNotation(String),
}

/// Move rejection. Every cause collapses to the same outcome so callers cannot
/// tell a wrong-turn submission from a self-check one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("invalid move")]
    IllegalMove,
}

/// Why a move was rejected. Only ever logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    GameAlreadyOver,
    NoPieceAtSource,
    WrongTurn,
    NotPseudoLegal,
    SelfCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("{0:?} has no king on the board")]
    MissingKing(Color),
    #[error("{0:?} has more than one king on the board")]
    DuplicateKing(Color),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("snapshot describes an invalid position: {0}")]
    Setup(#[from] SetupError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("game {0} not found")]
    NotFound(GameId),
    #[error("I/O error with file '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown game {0}")]
    UnknownGame(GameId),
    #[error("not your turn")]
    NotYourTurn,
    #[error("the {0} seat is already taken")]
    SeatTaken(Color),
    #[error("observers cannot {0}")]
    Observer(&'static str),
    #[error("not seated in this game")]
    NotSeated,
    #[error("subscription has left the game")]
    Departed,
    #[error("malformed command: {0}")]
    BadCommand(String),
    #[error("subscription closed")]
    Closed,
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config '{}': {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("broadcast capacity must be positive")]
    ZeroCapacity,
}
