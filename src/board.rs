// src/board.rs
use std::collections::BTreeMap;
use std::fmt;

use crate::chess_move::Move;
use crate::piece::{Color, Piece, PieceKind};
use crate::position::Position;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook, PieceKind::Knight, PieceKind::Bishop, PieceKind::Queen,
    PieceKind::King, PieceKind::Bishop, PieceKind::Knight, PieceKind::Rook,
];

/// Square-to-piece mapping handed to collaborators (persistence, broadcast).
pub type Layout = BTreeMap<Position, Piece>;

/// Sparse piece placement plus the en-passant state.
///
/// The container operations (`get`, `place`, `remove`) know nothing about
/// the rules. `make_move` is the one place where a move's side effects are
/// written down; both the legality filter (on a clone) and the game (on the
/// real board) go through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    squares: Layout,
    /// Square skipped by the last pawn double-step, if that was the last move.
    en_passant_target: Option<Position>,
    white_double_step: bool,
    black_double_step: bool,
}

impl Board {
    /// An empty board with no en-passant state.
    pub fn empty() -> Self { Board::default() }

    /// The standard starting arrangement.
    pub fn initial() -> Self {
        let mut board = Board::empty();
        for color in [Color::White, Color::Black] {
            for (i, kind) in BACK_RANK.iter().enumerate() {
                let column = i as i8 + 1;
                if let Ok(pos) = Position::new(color.home_row(), column) {
                    board.place(pos, Piece::new(*kind, color));
                }
                if let Ok(pos) = Position::new(color.pawn_row(), column) {
                    board.place(pos, Piece::new(PieceKind::Pawn, color));
                }
            }
        }
        board
    }

    /// Builds a board from a layout, with no en-passant state.
    pub fn from_layout(layout: Layout) -> Self {
        Board { squares: layout, ..Board::default() }
    }

    // --- Container operations ---

    #[inline]
    pub fn get(&self, pos: Position) -> Option<Piece> { self.squares.get(&pos).copied() }

    /// Puts `piece` on `pos`, returning whatever stood there.
    pub fn place(&mut self, pos: Position, piece: Piece) -> Option<Piece> { self.squares.insert(pos, piece) }

    pub fn remove(&mut self, pos: Position) -> Option<Piece> { self.squares.remove(&pos) }

    #[inline]
    pub fn is_occupied(&self, pos: Position) -> bool { self.squares.contains_key(&pos) }

    /// True if `pos` holds a piece of the other color.
    #[inline]
    pub fn is_enemy(&self, pos: Position, color: Color) -> bool {
        self.get(pos).is_some_and(|p| p.color != color)
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.squares.iter().map(|(pos, piece)| (*pos, *piece))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    /// Every square holding a king of `color`.
    pub fn kings(&self, color: Color) -> Vec<Position> {
        self.pieces_of(color).filter(|(_, p)| p.kind == PieceKind::King).map(|(pos, _)| pos).collect()
    }

    pub fn find_king(&self, color: Color) -> Option<Position> {
        self.pieces_of(color).find(|(_, p)| p.kind == PieceKind::King).map(|(pos, _)| pos)
    }

    pub fn layout(&self) -> &Layout { &self.squares }

    // --- En passant state ---

    pub fn en_passant_target(&self) -> Option<Position> { self.en_passant_target }

    /// Whether `color` double-stepped a pawn on the last move.
    pub fn double_stepped(&self, color: Color) -> bool {
        match color { Color::White => self.white_double_step, Color::Black => self.black_double_step }
    }

    /// Overwrites the en-passant state (restoring snapshots, custom setups).
    pub fn set_en_passant_state(&mut self, target: Option<Position>, white_double_step: bool, black_double_step: bool) {
        self.en_passant_target = target;
        self.white_double_step = white_double_step;
        self.black_double_step = black_double_step;
    }

    fn clear_en_passant(&mut self) {
        self.set_en_passant_state(None, false, false);
    }

    // --- Move application ---

    /// Applies `mv` with every side effect: castling rook, en-passant capture,
    /// double-step bookkeeping, promotion and the moved flag. Performs no
    /// legality checks. Returns the captured piece, if any.
    pub fn make_move(&mut self, mv: &Move) -> Option<Piece> {
        let mut piece = self.squares.remove(&mv.from)?;
        let mover = piece.color;
        let was_pawn = piece.kind == PieceKind::Pawn;
        let mut captured = self.squares.remove(&mv.to);

        match piece.kind {
            PieceKind::King if mv.column_shift().abs() == 2 => {
                // Castle: rook jumps to the square the king crossed.
                let row = mv.from.row();
                let (rook_from_col, rook_to_col) = if mv.column_shift() > 0 { (8, 6) } else { (1, 4) };
                if let (Ok(rook_from), Ok(rook_to)) = (Position::new(row, rook_from_col), Position::new(row, rook_to_col)) {
                    if let Some(mut rook) = self.squares.remove(&rook_from) {
                        rook.has_moved = true;
                        self.squares.insert(rook_to, rook);
                    }
                }
            }
            PieceKind::Pawn => {
                // Diagonal step onto the empty en-passant square takes the pawn behind it.
                if mv.column_shift() != 0 && captured.is_none() && Some(mv.to) == self.en_passant_target {
                    if let Some(victim_sq) = mv.to.offset(-mover.forward(), 0) {
                        captured = self.squares.remove(&victim_sq);
                    }
                }
                if mv.to.row() == mover.promotion_row() {
                    if let Some(kind) = mv.promotion {
                        piece.kind = kind;
                    }
                }
            }
            _ => {}
        }

        if was_pawn && mv.row_shift().abs() == 2 {
            let skipped = mv.from.offset(mover.forward(), 0);
            match mover {
                Color::White => self.set_en_passant_state(skipped, true, false),
                Color::Black => self.set_en_passant_state(skipped, false, true),
            }
        } else {
            self.clear_en_passant();
        }

        piece.has_moved = true;
        self.squares.insert(mv.to, piece);
        captured
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +-----------------+")?;
        for row in (1..=8).rev() {
            write!(f, "{} | ", row)?;
            for column in 1..=8 {
                match Position::new(row, column).ok().and_then(|pos| self.get(pos)) {
                    Some(piece) => write!(f, "{} ", piece)?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "  +-----------------+")?;
        write!(f, "    a b c d e f g h")
    }
}
