// src/game.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use crate::attacks::is_square_attacked;
use crate::board::Board;
use crate::chess_move::Move;
use crate::error::{MoveError, Rejection, SetupError};
use crate::legal::{has_any_legal_move, legal_moves};
use crate::movegen::pseudo_legal_moves;
use crate::piece::{Color, Piece};
use crate::position::Position;

/// Where the game stands. The color in `Check` and `Checkmate` is the side in
/// check; the color in `Resigned` is the side that gave up.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "state", content = "color", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    Check(Color),
    Checkmate(Color),
    Stalemate,
    Resigned(Color),
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Checkmate(_) | GameStatus::Stalemate | GameStatus::Resigned(_))
    }

    /// The winning side, if the game ended decisively.
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameStatus::Checkmate(loser) | GameStatus::Resigned(loser) => Some(loser.opponent()),
            _ => None,
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::Check(color) => write!(f, "{} is in check", color),
            GameStatus::Checkmate(color) => write!(f, "{} is checkmated, {} wins", color, color.opponent()),
            GameStatus::Stalemate => write!(f, "stalemate"),
            GameStatus::Resigned(color) => write!(f, "{} resigned, {} wins", color, color.opponent()),
        }
    }
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    pub mv: Move,
    pub mover: Color,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub status: GameStatus,
}

/// A two-player game. Owns its board; all mutation goes through
/// [`Game::apply_move`] and [`Game::resign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: Color,
    white_king: Position,
    black_king: Position,
    white_in_check: bool,
    black_in_check: bool,
    status: GameStatus,
}

impl Default for Game {
    fn default() -> Self { Game::new() }
}

impl Game {
    /// Standard starting position, White to move.
    pub fn new() -> Self {
        match Game::from_board(Board::initial(), Color::White) {
            Ok(game) => game,
            Err(e) => unreachable!("initial board is always valid: {}", e),
        }
    }

    /// A game from an arbitrary arrangement. Each side needs exactly one king.
    /// Check, checkmate and stalemate are evaluated immediately for `turn`.
    pub fn from_board(board: Board, turn: Color) -> Result<Self, SetupError> {
        let white_king = locate_single_king(&board, Color::White)?;
        let black_king = locate_single_king(&board, Color::Black)?;
        let mut game = Game {
            board,
            turn,
            white_king,
            black_king,
            white_in_check: false,
            black_in_check: false,
            status: GameStatus::InProgress,
        };
        game.refresh_status();
        Ok(game)
    }

    /// Restores a previously persisted state verbatim. A stored terminal status
    /// (e.g. a resignation) is kept rather than recomputed.
    pub(crate) fn restore(board: Board, turn: Color, status: GameStatus) -> Result<Self, SetupError> {
        let mut game = Game::from_board(board, turn)?;
        if status.is_terminal() {
            game.status = status;
        }
        Ok(game)
    }

    // --- Accessors ---

    pub fn board(&self) -> &Board { &self.board }

    pub fn turn(&self) -> Color { self.turn }

    pub fn status(&self) -> GameStatus { self.status }

    pub fn is_game_over(&self) -> bool { self.status.is_terminal() }

    pub fn king_position(&self, color: Color) -> Position {
        match color { Color::White => self.white_king, Color::Black => self.black_king }
    }

    /// Cached check flag, refreshed after every accepted move.
    pub fn is_in_check(&self, color: Color) -> bool {
        match color { Color::White => self.white_in_check, Color::Black => self.black_in_check }
    }

    /// In check with no legal move.
    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !has_any_legal_move(&self.board, color, self.king_position(color))
    }

    /// Not in check but with no legal move.
    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !has_any_legal_move(&self.board, color, self.king_position(color))
    }

    // --- Queries ---

    /// Legal moves of the piece on `pos`, whichever side it belongs to.
    /// Read-only; repeated calls return the same moves.
    pub fn valid_moves(&self, pos: Position) -> Vec<Move> {
        match self.board.get(pos) {
            Some(piece) => legal_moves(&self.board, pos, self.king_position(piece.color)),
            None => Vec::new(),
        }
    }

    /// Destination squares of [`Game::valid_moves`], for highlighting.
    pub fn valid_destinations(&self, pos: Position) -> BTreeSet<Position> {
        self.valid_moves(pos).into_iter().map(|mv| mv.to).collect()
    }

    /// Every legal move of the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        let king = self.king_position(self.turn);
        self.board
            .pieces_of(self.turn)
            .flat_map(|(from, _)| legal_moves(&self.board, from, king))
            .collect()
    }

    // --- Mutation ---

    /// Plays `mv` for the side to move. Any rejection leaves the game untouched
    /// and surfaces as the same [`MoveError::IllegalMove`].
    pub fn apply_move(&mut self, mv: &Move) -> Result<MoveReport, MoveError> {
        let piece = match self.validate(mv) {
            Ok(piece) => piece,
            Err(reason) => {
                debug!(%mv, ?reason, turn = ?self.turn, "move rejected");
                return Err(MoveError::IllegalMove);
            }
        };

        let mover = self.turn;
        let captured = self.board.make_move(mv);
        self.turn = mover.opponent();
        self.refresh_status();

        debug!(%mv, ?mover, captured = ?captured.map(|p| p.kind), status = ?self.status, "move applied");
        if self.status.is_terminal() {
            info!(status = %self.status, "game over");
        }

        Ok(MoveReport { mv: *mv, mover, piece, captured, status: self.status })
    }

    /// `color` concedes. Rejected once the game is already over.
    pub fn resign(&mut self, color: Color) -> Result<GameStatus, MoveError> {
        if self.is_game_over() {
            debug!(?color, reason = ?Rejection::GameAlreadyOver, "resignation rejected");
            return Err(MoveError::IllegalMove);
        }
        self.status = GameStatus::Resigned(color);
        info!(status = %self.status, "game over");
        Ok(self.status)
    }

    /// Runs every acceptance check without touching state.
    fn validate(&self, mv: &Move) -> Result<Piece, Rejection> {
        if self.is_game_over() { return Err(Rejection::GameAlreadyOver); }
        let piece = self.board.get(mv.from).ok_or(Rejection::NoPieceAtSource)?;
        if piece.color != self.turn { return Err(Rejection::WrongTurn); }
        if self.valid_moves(mv.from).contains(mv) { return Ok(piece); }
        // Distinguish the sub-reason for the log only.
        if pseudo_legal_moves(&self.board, mv.from).contains(mv) {
            Err(Rejection::SelfCheck)
        } else {
            Err(Rejection::NotPseudoLegal)
        }
    }

    /// Recomputes king positions, both check flags and the status for the side to move.
    fn refresh_status(&mut self) {
        if let Some(pos) = self.board.find_king(Color::White) { self.white_king = pos; }
        if let Some(pos) = self.board.find_king(Color::Black) { self.black_king = pos; }
        self.white_in_check = is_square_attacked(&self.board, self.white_king, Color::White);
        self.black_in_check = is_square_attacked(&self.board, self.black_king, Color::Black);

        let side = self.turn;
        let in_check = self.is_in_check(side);
        let can_move = has_any_legal_move(&self.board, side, self.king_position(side));
        self.status = match (in_check, can_move) {
            (true, false) => GameStatus::Checkmate(side),
            (false, false) => GameStatus::Stalemate,
            (true, true) => GameStatus::Check(side),
            (false, true) => GameStatus::InProgress,
        };
    }
}

fn locate_single_king(board: &Board, color: Color) -> Result<Position, SetupError> {
    match board.kings(color).as_slice() {
        [] => Err(SetupError::MissingKing(color)),
        [single] => Ok(*single),
        _ => Err(SetupError::DuplicateKing(color)),
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        writeln!(f, "Turn: {}", self.turn)?;
        match self.board.en_passant_target() {
            Some(target) => writeln!(f, "En Passant Target: {}", target)?,
            None => writeln!(f, "En Passant Target: -")?,
        }
        write!(f, "Status: {}", self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    fn sq(s: &str) -> Position { s.parse().unwrap() }
    fn mv(s: &str) -> Move { s.parse().unwrap() }

    #[test]
    fn new_game_starts_with_white_in_progress() {
        let game = Game::new();
        assert_eq!(game.turn(), Color::White);
        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.legal_moves().len(), 20);
        assert_eq!(game.king_position(Color::Black), sq("e8"));
    }

    #[test]
    fn accepted_move_flips_turn_and_marks_piece_moved() {
        let mut game = Game::new();
        let report = game.apply_move(&mv("g1f3")).unwrap();
        assert_eq!(report.mover, Color::White);
        assert_eq!(report.piece.kind, PieceKind::Knight);
        assert_eq!(game.turn(), Color::Black);
        assert!(game.board().get(sq("f3")).unwrap().has_moved);
    }

    #[test]
    fn rejections_are_uniform_and_atomic() {
        let mut game = Game::new();
        let before = game.clone();
        for bad in ["e3e4", "e7e5", "e2e5", "b1d2", "e1e2"] {
            assert_eq!(game.apply_move(&mv(bad)), Err(MoveError::IllegalMove), "{bad}");
            assert_eq!(game, before);
        }
    }

    #[test]
    fn promotion_requires_a_matching_choice() {
        let mut board = Board::empty();
        board.place(sq("a1"), Piece::moved(PieceKind::King, Color::White));
        board.place(sq("h8"), Piece::moved(PieceKind::King, Color::Black));
        board.place(sq("c7"), Piece::moved(PieceKind::Pawn, Color::White));
        let mut game = Game::from_board(board, Color::White).unwrap();

        assert_eq!(game.apply_move(&mv("c7c8")), Err(MoveError::IllegalMove));
        let report = game.apply_move(&mv("c7c8r")).unwrap();
        // The new rook sees h8 along the back rank.
        assert_eq!(report.status, GameStatus::Check(Color::Black));
        assert_eq!(game.board().get(sq("c8")).map(|p| p.kind), Some(PieceKind::Rook));
    }

    #[test]
    fn from_board_requires_one_king_each() {
        let mut board = Board::empty();
        board.place(sq("e1"), Piece::new(PieceKind::King, Color::White));
        assert_eq!(Game::from_board(board.clone(), Color::White), Err(SetupError::MissingKing(Color::Black)));
        board.place(sq("e8"), Piece::new(PieceKind::King, Color::Black));
        board.place(sq("a8"), Piece::new(PieceKind::King, Color::Black));
        assert_eq!(Game::from_board(board, Color::White), Err(SetupError::DuplicateKing(Color::Black)));
    }

    #[test]
    fn stalemate_is_terminal_without_check() {
        // Queen on b6 covers every flight square of the a8 king.
        let mut board = Board::empty();
        board.place(sq("a8"), Piece::moved(PieceKind::King, Color::Black));
        board.place(sq("b6"), Piece::moved(PieceKind::Queen, Color::White));
        board.place(sq("c1"), Piece::moved(PieceKind::King, Color::White));
        let game = Game::from_board(board, Color::Black).unwrap();
        assert_eq!(game.status(), GameStatus::Stalemate);
        assert!(game.is_in_stalemate(Color::Black));
        assert!(!game.is_in_check(Color::Black));
        assert!(game.is_game_over());
    }

    #[test]
    fn resignation_ends_the_game() {
        let mut game = Game::new();
        assert_eq!(game.resign(Color::Black), Ok(GameStatus::Resigned(Color::Black)));
        assert_eq!(game.status().winner(), Some(Color::White));
        assert_eq!(game.apply_move(&mv("e2e4")), Err(MoveError::IllegalMove));
        assert_eq!(game.resign(Color::White), Err(MoveError::IllegalMove));
    }

    #[test]
    fn check_is_reported_for_side_to_move() {
        let mut game = Game::new();
        for m in ["e2e4", "f7f6", "d2d4", "g7g5"] {
            game.apply_move(&mv(m)).unwrap();
        }
        let report = game.apply_move(&mv("d1h5")).unwrap();
        assert_eq!(report.status, GameStatus::Checkmate(Color::Black));
        assert!(game.is_in_check(Color::Black));
        assert!(!game.is_in_check(Color::White));
    }
}
