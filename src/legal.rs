// src/legal.rs
//! Legality filtering: a pseudo-legal move survives only if, played out on a
//! throwaway copy of the board, it leaves the mover's king unattacked.
use crate::attacks::is_king_safe;
use crate::board::Board;
use crate::chess_move::Move;
use crate::movegen::pseudo_legal_moves;
use crate::piece::{Color, PieceKind};
use crate::position::Position;

/// Legal moves of the piece on `from`, given where its side's king stands.
pub fn legal_moves(board: &Board, from: Position, own_king: Position) -> Vec<Move> {
    let Some(piece) = board.get(from) else { return Vec::new() };
    pseudo_legal_moves(board, from)
        .into_iter()
        .filter(|mv| {
            let king = if piece.kind == PieceKind::King { mv.to } else { own_king };
            leaves_king_safe(board, mv, king, piece.color)
        })
        .collect()
}

/// Simulates `mv` on a clone; the real board is never touched.
pub fn leaves_king_safe(board: &Board, mv: &Move, king_after: Position, color: Color) -> bool {
    let mut trial = board.clone();
    trial.make_move(mv);
    is_king_safe(&trial, king_after, color)
}

/// Whether `color` has at least one legal move anywhere on the board.
pub fn has_any_legal_move(board: &Board, color: Color, own_king: Position) -> bool {
    board.pieces_of(color).any(|(from, _)| !legal_moves(board, from, own_king).is_empty())
}
