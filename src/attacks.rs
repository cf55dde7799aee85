// src/attacks.rs
//! Attack detection. Depends on the board alone and never on move legality,
//! which lets castling generation ask about attacked squares without
//! recursing into the legal-move layer.
use crate::board::Board;
use crate::geometry::{self, DIAGONALS, ORTHOGONALS};
use crate::piece::{Color, PieceKind};
use crate::position::Position;

/// Checks if `target` is attacked by the opponents of `defender`, i.e. whether
/// a `defender` king standing on `target` would be in check.
pub fn is_square_attacked(board: &Board, target: Position, defender: Color) -> bool {
    let attacker = defender.opponent();
    let enemy_is = |pos: Position, kinds: &[PieceKind]| {
        board.get(pos).is_some_and(|p| p.color == attacker && kinds.contains(&p.kind))
    };

    // Sliding pieces: only the first piece hit along a ray counts.
    let ray_hits = |directions: &[(i8, i8)], kinds: &[PieceKind]| {
        directions.iter().any(|&(dr, dc)| {
            first_piece_on_ray(board, target, dr, dc).is_some_and(|pos| enemy_is(pos, kinds))
        })
    };
    if ray_hits(&ORTHOGONALS, &[PieceKind::Rook, PieceKind::Queen]) { return true; }
    if ray_hits(&DIAGONALS, &[PieceKind::Bishop, PieceKind::Queen]) { return true; }

    // Knights
    if geometry::knight_targets(target).iter().any(|&pos| enemy_is(pos, &[PieceKind::Knight])) { return true; }

    // Pawns strike diagonally forward, so they sit one row ahead of the defender.
    let pawn_row = defender.forward();
    if [-1, 1].iter().filter_map(|&dc| target.offset(pawn_row, dc)).any(|pos| enemy_is(pos, &[PieceKind::Pawn])) {
        return true;
    }

    // King
    geometry::king_targets(target).iter().any(|&pos| enemy_is(pos, &[PieceKind::King]))
}

#[inline]
pub fn is_king_safe(board: &Board, king: Position, color: Color) -> bool {
    !is_square_attacked(board, king, color)
}

/// Whether the king of `color` is attacked. A board without that king reports no check.
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board.find_king(color).is_some_and(|king| is_square_attacked(board, king, color))
}

fn first_piece_on_ray(board: &Board, from: Position, dr: i8, dc: i8) -> Option<Position> {
    let mut current = from;
    while let Some(next) = current.offset(dr, dc) {
        if board.is_occupied(next) { return Some(next); }
        current = next;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;
    use test_case::test_case;

    fn sq(s: &str) -> Position { s.parse().unwrap() }

    fn board_with(pieces: &[(&str, PieceKind, Color)]) -> Board {
        let mut board = Board::empty();
        for &(s, kind, color) in pieces {
            board.place(sq(s), Piece::new(kind, color));
        }
        board
    }

    #[test_case("e8", PieceKind::Rook, true; "rook on file")]
    #[test_case("a4", PieceKind::Queen, false; "queen off every line")]
    #[test_case("b4", PieceKind::Bishop, true; "bishop on diagonal")]
    #[test_case("e7", PieceKind::Bishop, false; "bishop on file")]
    #[test_case("f3", PieceKind::Knight, true; "knight jump")]
    #[test_case("d2", PieceKind::Pawn, true; "black pawn one row ahead")]
    #[test_case("e2", PieceKind::Pawn, false; "pawn straight ahead")]
    #[test_case("d2", PieceKind::King, true; "adjacent king")]
    fn white_king_on_e1_against_single_attacker(at: &str, kind: PieceKind, attacked: bool) {
        let board = board_with(&[("e1", PieceKind::King, Color::White), (at, kind, Color::Black)]);
        assert_eq!(is_square_attacked(&board, sq("e1"), Color::White), attacked);
    }

    #[test]
    fn blocked_ray_is_safe() {
        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("e4", PieceKind::Knight, Color::White),
            ("e8", PieceKind::Rook, Color::Black),
        ]);
        assert!(is_king_safe(&board, sq("e1"), Color::White));
    }

    #[test]
    fn pawn_direction_depends_on_defender() {
        // A white pawn on d7 covers c8 and e8 only.
        let board = board_with(&[("d7", PieceKind::Pawn, Color::White)]);
        assert!(is_square_attacked(&board, sq("e8"), Color::Black));
        assert!(!is_square_attacked(&board, sq("c6"), Color::Black));
    }

    #[test]
    fn friendly_pieces_never_attack() {
        let board = board_with(&[
            ("e1", PieceKind::King, Color::White),
            ("e8", PieceKind::Queen, Color::White),
            ("f3", PieceKind::Knight, Color::White),
        ]);
        assert!(!is_in_check(&board, Color::White));
    }

    #[test]
    fn start_position_has_no_check() {
        let board = Board::initial();
        assert!(!is_in_check(&board, Color::White));
        assert!(!is_in_check(&board, Color::Black));
    }
}
