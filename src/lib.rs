// Two-player chess rules engine with per-game session fan-out.
// Board representation: sparse map from square to piece

pub mod attacks;
pub mod board;
pub mod chess_move;
pub mod config;
pub mod error;
pub mod game;
pub mod geometry;
pub mod legal;
pub mod movegen;
pub mod piece;
pub mod position;
pub mod session;
pub mod snapshot;
pub mod store;

pub use board::{Board, Layout};
pub use chess_move::Move;
pub use config::Config;
pub use error::{ConfigError, MoveError, PositionError, SessionError, SetupError, SnapshotError, StoreError};
pub use game::{Game, GameStatus, MoveReport};
pub use piece::{Color, Piece, PieceKind};
pub use position::Position;
pub use session::{ClientCommand, CommandType, GameId, Role, ServerMessage, SessionManager, Subscription};
pub use snapshot::GameSnapshot;
pub use store::{GameStore, JsonFileStore, MemoryStore};
