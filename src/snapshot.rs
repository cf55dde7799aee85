// src/snapshot.rs
use serde::{Deserialize, Serialize};

use crate::board::{Board, Layout};
use crate::error::SnapshotError;
use crate::game::{Game, GameStatus};
use crate::piece::Color;
use crate::position::Position;

/// Everything needed to resume a game. Board keys are algebraic squares.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub board: Layout,
    pub turn: Color,
    pub white_in_check: bool,
    pub black_in_check: bool,
    #[serde(default)]
    pub en_passant_target: Option<Position>,
    #[serde(default)]
    pub white_double_step: bool,
    #[serde(default)]
    pub black_double_step: bool,
    pub status: GameStatus,
    pub game_over: bool,
}

impl GameSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Game {
    pub fn snapshot(&self) -> GameSnapshot {
        let board = self.board();
        GameSnapshot {
            board: board.layout().clone(),
            turn: self.turn(),
            white_in_check: self.is_in_check(Color::White),
            black_in_check: self.is_in_check(Color::Black),
            en_passant_target: board.en_passant_target(),
            white_double_step: board.double_stepped(Color::White),
            black_double_step: board.double_stepped(Color::Black),
            status: self.status(),
            game_over: self.is_game_over(),
        }
    }

    /// Rebuilds a game from a snapshot. Check flags and non-terminal status are
    /// recomputed from the board; a stored resignation is kept.
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Result<Game, SnapshotError> {
        let mut board = Board::from_layout(snapshot.board.clone());
        board.set_en_passant_state(
            snapshot.en_passant_target,
            snapshot.white_double_step,
            snapshot.black_double_step,
        );
        Ok(Game::restore(board, snapshot.turn, snapshot.status)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess_move::Move;
    use crate::error::SetupError;

    fn mv(s: &str) -> Move { s.parse().unwrap() }

    #[test]
    fn json_uses_algebraic_keys_and_camel_case() {
        let mut game = Game::new();
        game.apply_move(&mv("e2e4")).unwrap();
        let json = game.snapshot().to_json().unwrap();
        assert!(json.contains(r#""e4": {"#));
        assert!(json.contains(r#""enPassantTarget": "e3""#));
        assert!(json.contains(r#""whiteDoubleStep": true"#));
        assert!(json.contains(r#""gameOver": false"#));
    }

    #[test]
    fn restore_reproduces_the_game() {
        let mut game = Game::new();
        for m in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            game.apply_move(&mv(m)).unwrap();
        }
        let json = game.snapshot().to_json().unwrap();
        let restored = Game::from_snapshot(&GameSnapshot::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored, game);
        assert!(restored.valid_moves("e5".parse().unwrap()).contains(&mv("e5d6")));
    }

    #[test]
    fn resignation_survives_restore() {
        let mut game = Game::new();
        game.resign(Color::White).unwrap();
        let restored = Game::from_snapshot(&game.snapshot()).unwrap();
        assert_eq!(restored.status(), GameStatus::Resigned(Color::White));
    }

    #[test]
    fn kingless_snapshot_is_rejected() {
        let mut snapshot = Game::new().snapshot();
        snapshot.board.retain(|_, piece| piece.color == Color::White);
        match Game::from_snapshot(&snapshot) {
            Err(SnapshotError::Setup(SetupError::MissingKing(Color::Black))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(GameSnapshot::from_json("{\"board\": 3}"), Err(SnapshotError::Serialization(_))));
    }
}
