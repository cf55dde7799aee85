// src/geometry.rs
//! Direction vectors and precomputed jump tables shared by move generation
//! and attack detection.
use lazy_static::lazy_static;

use crate::position::Position;

pub const ORTHOGONALS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const DIAGONALS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1), (2, -1), (-2, 1), (-2, -1),
    (1, 2), (1, -2), (-1, 2), (-1, -2),
];

pub const KING_OFFSETS: [(i8, i8); 8] = [
    (1, -1), (1, 0), (1, 1),
    (0, -1),         (0, 1),
    (-1, -1), (-1, 0), (-1, 1),
];

lazy_static! {
    pub static ref KNIGHT_TARGETS: Vec<Vec<Position>> = compute_targets(&KNIGHT_OFFSETS);
    pub static ref KING_TARGETS: Vec<Vec<Position>> = compute_targets(&KING_OFFSETS);
}

/// For every square (by `Position::index`), the on-board squares reached by the offsets.
fn compute_targets(offsets: &[(i8, i8)]) -> Vec<Vec<Position>> {
    Position::all()
        .map(|from| offsets.iter().filter_map(|&(dr, dc)| from.offset(dr, dc)).collect())
        .collect()
}

#[inline]
pub fn knight_targets(from: Position) -> &'static [Position] {
    &KNIGHT_TARGETS[from.index()]
}

#[inline]
pub fn king_targets(from: Position) -> &'static [Position] {
    &KING_TARGETS[from.index()]
}
