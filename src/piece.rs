// src/piece.rs
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color { White, Black }

impl Color {
    pub fn opponent(&self) -> Color {
        match self { Color::White => Color::Black, Color::Black => Color::White }
    }

    /// Row of this side's back rank.
    pub fn home_row(&self) -> i8 {
        match self { Color::White => 1, Color::Black => 8 }
    }

    /// Row this side's pawns start on.
    pub fn pawn_row(&self) -> i8 {
        match self { Color::White => 2, Color::Black => 7 }
    }

    /// Row a pawn of this side promotes on.
    pub fn promotion_row(&self) -> i8 {
        match self { Color::White => 8, Color::Black => 1 }
    }

    /// Row delta of a forward pawn step.
    pub fn forward(&self) -> i8 {
        match self { Color::White => 1, Color::Black => -1 }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind { King, Queen, Rook, Bishop, Knight, Pawn }

impl PieceKind {
    /// Kinds a pawn may promote to, in emission order.
    pub const PROMOTIONS: [PieceKind; 4] = [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

    pub fn symbol(&self) -> char {
        match self {
            PieceKind::Pawn => 'p', PieceKind::Knight => 'n', PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r', PieceKind::Queen => 'q', PieceKind::King => 'k',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn), 'n' => Some(PieceKind::Knight), 'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook), 'q' => Some(PieceKind::Queen), 'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::King => "king", PieceKind::Queen => "queen", PieceKind::Rook => "rook",
            PieceKind::Bishop => "bishop", PieceKind::Knight => "knight", PieceKind::Pawn => "pawn",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
    /// Set the first time the piece relocates; never cleared.
    #[serde(default)]
    pub has_moved: bool,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self { Piece { color, kind, has_moved: false } }

    /// Same piece, already flagged as moved. Handy for custom setups.
    pub fn moved(kind: PieceKind, color: Color) -> Self { Piece { color, kind, has_moved: true } }

    /// Parses a FEN-style letter: uppercase is White.
    pub fn from_char(c: char) -> Option<Self> {
        let color = if c.is_uppercase() { Color::White } else { Color::Black };
        PieceKind::from_symbol(c).map(|kind| Piece::new(kind, color))
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.kind.symbol();
        let symbol = match self.color {
            Color::White => symbol.to_ascii_uppercase(),
            Color::Black => symbol,
        };
        write!(f, "{}", symbol)
    }
}
