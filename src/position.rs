// src/position.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PositionError;

pub const MIN_COORD: i8 = 1;
pub const MAX_COORD: i8 = 8;

/// A square on the board. Row 1 is White's home rank, column 1 is the a-file.
///
/// Only constructible through [`Position::new`] (or parsing), so every value
/// in circulation is on the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Position {
    row: i8,
    column: i8,
}

impl Position {
    pub fn new(row: i8, column: i8) -> Result<Self, PositionError> {
        if Self::on_board(row, column) {
            Ok(Position { row, column })
        } else {
            Err(PositionError::InvalidCoordinate { row, column })
        }
    }

    #[inline]
    pub fn row(&self) -> i8 { self.row }

    #[inline]
    pub fn column(&self) -> i8 { self.column }

    #[inline]
    pub fn on_board(row: i8, column: i8) -> bool {
        (MIN_COORD..=MAX_COORD).contains(&row) && (MIN_COORD..=MAX_COORD).contains(&column)
    }

    /// Square reached by stepping `(d_row, d_col)`, or `None` when it leaves the board.
    #[inline]
    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Position> {
        Position::new(self.row + d_row, self.column + d_col).ok()
    }

    /// Dense index 0..64 (a1 = 0, h8 = 63), used for the precomputed tables.
    #[inline]
    pub fn index(&self) -> usize {
        ((self.row - 1) * 8 + (self.column - 1)) as usize
    }

    pub fn from_index(index: usize) -> Option<Position> {
        if index >= 64 { return None; }
        Position::new((index / 8) as i8 + 1, (index % 8) as i8 + 1).ok()
    }

    /// Iterates all 64 squares, a1 first.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..64).filter_map(Position::from_index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file_char = (b'a' + (self.column - 1) as u8) as char;
        let rank_char = (b'1' + (self.row - 1) as u8) as char;
        write!(f, "{}{}", file_char, rank_char)
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (file_char, rank_char) = match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => (f.to_ascii_lowercase(), r),
            _ => return Err(PositionError::InvalidNotation(s.to_string())),
        };
        let column = match file_char { 'a'..='h' => (file_char as u8 - b'a') as i8 + 1, _ => return Err(PositionError::InvalidNotation(s.to_string())) };
        let row = match rank_char { '1'..='8' => (rank_char as u8 - b'1') as i8 + 1, _ => return Err(PositionError::InvalidNotation(s.to_string())) };
        Position::new(row, column)
    }
}

impl TryFrom<String> for Position {
    type Error = PositionError;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Position> for String {
    fn from(pos: Position) -> Self { pos.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1)]
    #[test_case(9, 4)]
    #[test_case(3, 0)]
    #[test_case(8, 9)]
    fn rejects_off_board_coordinates(row: i8, column: i8) {
        assert_eq!(
            Position::new(row, column),
            Err(PositionError::InvalidCoordinate { row, column })
        );
    }

    #[test]
    fn algebraic_text_maps_to_row_and_column() {
        let pos: Position = "e4".parse().unwrap();
        assert_eq!((pos.row(), pos.column()), (4, 5));
        assert_eq!(pos.to_string(), "e4");
        assert_eq!("H8".parse::<Position>().unwrap(), Position::new(8, 8).unwrap());
    }

    #[test_case("e9")]
    #[test_case("i1")]
    #[test_case("e")]
    #[test_case("e44")]
    fn malformed_text_is_rejected(text: &str) {
        assert!(matches!(text.parse::<Position>(), Err(PositionError::InvalidNotation(_))));
    }

    #[test]
    fn index_round_trips_over_every_square() {
        let squares: Vec<Position> = Position::all().collect();
        assert_eq!(squares.len(), 64);
        for (i, sq) in squares.iter().enumerate() {
            assert_eq!(sq.index(), i);
        }
    }

    #[test]
    fn serializes_as_algebraic_string() {
        let pos = Position::new(2, 1).unwrap();
        assert_eq!(serde_json::to_string(&pos).unwrap(), "\"a2\"");
        let back: Position = serde_json::from_str("\"a2\"").unwrap();
        assert_eq!(back, pos);
    }
}
