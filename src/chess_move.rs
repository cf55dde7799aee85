// src/chess_move.rs
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PositionError;
use crate::piece::PieceKind;
use crate::position::Position;

lazy_static! {
    // from-square, to-square, optional promotion letter; separators tolerated ("e2-e4", "e2 e4")
    static ref MOVE_NOTATION: Regex = Regex::new(r"^([a-h][1-8])[\s\-x]?([a-h][1-8])=?([qrbnQRBN])?$")
        .expect("move notation pattern is valid");
}

/// A move request: source, destination and the promotion choice, if any.
/// Castling is expressed as the king's two-column move.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    #[serde(default)]
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(from: Position, to: Position) -> Self { Move { from, to, promotion: None } }

    pub fn promoting(from: Position, to: Position, kind: PieceKind) -> Self {
        Move { from, to, promotion: Some(kind) }
    }

    /// Column distance travelled. A king move of 2 is a castle.
    #[inline]
    pub fn column_shift(&self) -> i8 { self.to.column() - self.from.column() }

    #[inline]
    pub fn row_shift(&self) -> i8 { self.to.row() - self.from.row() }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = PositionError;

    /// Parses coordinate notation (e.g. "e2e4", "a7a8q"). Validates format only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let caps = MOVE_NOTATION.captures(&lowered)
            .ok_or_else(|| PositionError::InvalidMoveNotation(trimmed.to_string()))?;
        let from: Position = caps[1].parse()?;
        let to: Position = caps[2].parse()?;
        let promotion = match caps.get(3) {
            Some(m) => Some(m.as_str().chars().next().and_then(PieceKind::from_symbol)
                .ok_or_else(|| PositionError::InvalidMoveNotation(trimmed.to_string()))?),
            None => None,
        };
        Ok(Move { from, to, promotion })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("e2e4", "e2", "e4", None)]
    #[test_case("E2-E4", "e2", "e4", None)]
    #[test_case("a7a8q", "a7", "a8", Some(PieceKind::Queen))]
    #[test_case("b2xa1=N", "b2", "a1", Some(PieceKind::Knight))]
    fn parses_coordinate_notation(text: &str, from: &str, to: &str, promotion: Option<PieceKind>) {
        let mv: Move = text.parse().unwrap();
        assert_eq!(mv.from, from.parse().unwrap());
        assert_eq!(mv.to, to.parse().unwrap());
        assert_eq!(mv.promotion, promotion);
    }

    #[test_case("e2")]
    #[test_case("e2e9")]
    #[test_case("e7e8k")]
    #[test_case("O-O")]
    fn rejects_malformed_notation(text: &str) {
        assert!(matches!(text.parse::<Move>(), Err(PositionError::InvalidMoveNotation(_))));
    }

    #[test]
    fn display_includes_promotion_letter() {
        let mv: Move = "g7g8r".parse().unwrap();
        assert_eq!(mv.to_string(), "g7g8r");
    }

    #[test]
    fn wire_shape_has_nullable_promotion() {
        let mv: Move = serde_json::from_str(r#"{"from":"e2","to":"e4","promotion":null}"#).unwrap();
        assert_eq!(mv, "e2e4".parse().unwrap());
        let json = serde_json::to_string(&"e7e8q".parse::<Move>().unwrap()).unwrap();
        assert_eq!(json, r#"{"from":"e7","to":"e8","promotion":"QUEEN"}"#);
    }
}
