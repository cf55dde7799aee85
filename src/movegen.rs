// src/movegen.rs
//! Pseudo-legal move generation: geometry and occupancy only. Whether a move
//! leaves the mover's own king attacked is decided later, in `legal`.
use crate::attacks::is_square_attacked;
use crate::board::Board;
use crate::chess_move::Move;
use crate::geometry::{self, DIAGONALS, ORTHOGONALS};
use crate::piece::{Color, Piece, PieceKind};
use crate::position::Position;

const KING_HOME_COLUMN: i8 = 5;

/// Pseudo-legal moves of the piece on `from`. An empty square yields no moves.
pub fn pseudo_legal_moves(board: &Board, from: Position) -> Vec<Move> {
    let mut moves = Vec::with_capacity(28);
    if let Some(piece) = board.get(from) {
        generate_moves_for_piece(board, from, piece, &mut moves);
    }
    moves
}

/// Pseudo-legal moves of every piece of `color`.
pub fn all_pseudo_legal_moves(board: &Board, color: Color) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    for (from, piece) in board.pieces_of(color) {
        generate_moves_for_piece(board, from, piece, &mut moves);
    }
    moves
}

#[inline]
fn generate_moves_for_piece(board: &Board, from: Position, piece: Piece, moves: &mut Vec<Move>) {
    match piece.kind {
        PieceKind::Pawn => generate_pawn_moves(board, from, piece.color, moves),
        PieceKind::Knight => generate_step_moves(board, from, piece.color, geometry::knight_targets(from), moves),
        PieceKind::Bishop => generate_sliding_moves(board, from, piece.color, &DIAGONALS, moves),
        PieceKind::Rook => generate_sliding_moves(board, from, piece.color, &ORTHOGONALS, moves),
        PieceKind::Queen => {
            generate_sliding_moves(board, from, piece.color, &ORTHOGONALS, moves);
            generate_sliding_moves(board, from, piece.color, &DIAGONALS, moves);
        }
        PieceKind::King => {
            generate_step_moves(board, from, piece.color, geometry::king_targets(from), moves);
            generate_castling_moves(board, from, piece, moves);
        }
    }
}

/// Walks each ray until the edge, a friendly piece (excluded) or an enemy piece (included).
fn generate_sliding_moves(board: &Board, from: Position, color: Color, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(dr, dc) in directions {
        let mut current = from;
        while let Some(next) = current.offset(dr, dc) {
            match board.get(next) {
                None => moves.push(Move::new(from, next)),
                Some(other) => {
                    if other.color != color {
                        moves.push(Move::new(from, next));
                    }
                    break;
                }
            }
            current = next;
        }
    }
}

/// Single-jump pieces (knight, king): any target that is not friendly-occupied.
fn generate_step_moves(board: &Board, from: Position, color: Color, targets: &[Position], moves: &mut Vec<Move>) {
    for &to in targets {
        if board.get(to).map_or(true, |p| p.color != color) {
            moves.push(Move::new(from, to));
        }
    }
}

/// Castling candidates. The king must be unmoved on its home square and not in
/// check; the rook unmoved; every square between them empty and unattacked.
fn generate_castling_moves(board: &Board, from: Position, king: Piece, moves: &mut Vec<Move>) {
    let color = king.color;
    let home = color.home_row();
    if king.has_moved || from.row() != home || from.column() != KING_HOME_COLUMN { return; }
    if is_square_attacked(board, from, color) { return; }

    // (rook column, king destination column, columns strictly between king and rook)
    for (rook_col, king_to_col, between) in [(8, 7, 6..=7), (1, 3, 2..=4)] {
        let Ok(rook_sq) = Position::new(home, rook_col) else { continue };
        let rook_ready = board.get(rook_sq)
            .is_some_and(|r| r.kind == PieceKind::Rook && r.color == color && !r.has_moved);
        if !rook_ready { continue; }

        let path: Vec<Position> = between.filter_map(|c| Position::new(home, c).ok()).collect();
        if path.iter().any(|&sq| board.is_occupied(sq)) { continue; }
        if path.iter().any(|&sq| is_square_attacked(board, sq, color)) { continue; }

        if let Ok(to) = Position::new(home, king_to_col) {
            moves.push(Move::new(from, to));
        }
    }
}

fn generate_pawn_moves(board: &Board, from: Position, color: Color, moves: &mut Vec<Move>) {
    let dir = color.forward();

    // 1. Pushes
    if let Some(one) = from.offset(dir, 0) {
        if !board.is_occupied(one) {
            push_pawn_move(from, one, color, moves);
            // 2. Double push (only possible if single push is)
            if from.row() == color.pawn_row() {
                if let Some(two) = from.offset(2 * dir, 0) {
                    if !board.is_occupied(two) {
                        moves.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    // 3. Captures, regular and en passant
    for dc in [-1, 1] {
        let Some(target) = from.offset(dir, dc) else { continue };
        if board.is_enemy(target, color) {
            push_pawn_move(from, target, color, moves);
        } else if is_en_passant_capture(board, from, target, color) {
            moves.push(Move::new(from, target));
        }
    }
}

/// The target must be the live en-passant square, the opponent must have just
/// double-stepped, and the capturing pawn must stand on its fifth rank.
fn is_en_passant_capture(board: &Board, from: Position, target: Position, color: Color) -> bool {
    let capture_row = color.pawn_row() + 3 * color.forward();
    board.en_passant_target() == Some(target)
        && board.double_stepped(color.opponent())
        && from.row() == capture_row
        && !board.is_occupied(target)
}

#[inline]
fn push_pawn_move(from: Position, to: Position, color: Color, moves: &mut Vec<Move>) {
    if to.row() == color.promotion_row() {
        add_promotions(from, to, moves);
    } else {
        moves.push(Move::new(from, to));
    }
}

/// One move per promotion choice; a bare pawn move onto the far rank is never emitted.
#[inline]
fn add_promotions(from: Position, to: Position, moves: &mut Vec<Move>) {
    for kind in PieceKind::PROMOTIONS {
        moves.push(Move::promoting(from, to, kind));
    }
}
