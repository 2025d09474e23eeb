//! Directional move rules and the ray-walking move generator
//!
//! A piece's movement is a list of [`MoveRule`]s. Each rule is a direction
//! that is walked one step at a time up to its maximum distance, with flags
//! controlling blocking and captures. Sliders, steppers, leapers and pawns
//! all fall out of the same walk.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord};
use crate::pieces::{Color, PieceKind};

/// Maximum distance for sliding rules
pub const UNBOUNDED: u32 = u32::MAX;

/// One geometric movement pattern
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveRule {
    pub dx: i32,
    pub dy: i32,
    /// Steps along the direction, at least 1
    pub max_distance: u32,
    /// Pass over enemy pieces instead of stopping on them
    pub can_jump: bool,
    /// Only valid onto an enemy piece
    pub must_capture: bool,
    /// Never valid onto an enemy piece
    pub cannot_capture: bool,
}

impl MoveRule {
    pub const fn new(dx: i32, dy: i32, max_distance: u32) -> Self {
        Self {
            dx,
            dy,
            max_distance: if max_distance == 0 { 1 } else { max_distance },
            can_jump: false,
            must_capture: false,
            cannot_capture: false,
        }
    }

    /// Single square
    pub const fn step(dx: i32, dy: i32) -> Self {
        Self::new(dx, dy, 1)
    }

    /// Any distance until blocked
    pub const fn slide(dx: i32, dy: i32) -> Self {
        Self::new(dx, dy, UNBOUNDED)
    }

    /// Single leap ignoring what lies between
    pub const fn leap(dx: i32, dy: i32) -> Self {
        Self::step(dx, dy).jumping()
    }

    pub const fn jumping(mut self) -> Self {
        self.can_jump = true;
        self
    }

    pub const fn capture_only(mut self) -> Self {
        self.must_capture = true;
        self
    }

    pub const fn no_capture(mut self) -> Self {
        self.cannot_capture = true;
        self
    }

    /// Copy of this rule reaching `extra` squares further
    pub fn extended(self, extra: u32) -> Self {
        Self {
            max_distance: self.max_distance.saturating_add(extra),
            ..self
        }
    }
}

// ============================================================================
// STANDARD RULE SETS
// ============================================================================

const ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];
const KNIGHT_LEAPS: [(i32, i32); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

/// Pawn push plus diagonal captures
pub fn pawn_rules(color: Color) -> Vec<MoveRule> {
    let f = color.forward();
    vec![
        MoveRule::step(0, f).no_capture(),
        MoveRule::step(1, f).capture_only(),
        MoveRule::step(-1, f).capture_only(),
    ]
}

/// Rules a piece of `kind` is spawned with
///
/// Custom pieces without their own rules move like pawns.
pub fn standard_rules(kind: PieceKind, color: Color) -> Vec<MoveRule> {
    match kind {
        PieceKind::Pawn | PieceKind::Custom => pawn_rules(color),
        PieceKind::Rook => ORTHOGONAL.iter().map(|&(dx, dy)| MoveRule::slide(dx, dy)).collect(),
        PieceKind::Bishop => DIAGONAL.iter().map(|&(dx, dy)| MoveRule::slide(dx, dy)).collect(),
        PieceKind::Queen => ORTHOGONAL
            .iter()
            .chain(DIAGONAL.iter())
            .map(|&(dx, dy)| MoveRule::slide(dx, dy))
            .collect(),
        PieceKind::Knight => KNIGHT_LEAPS
            .iter()
            .map(|&(dx, dy)| MoveRule::leap(dx, dy))
            .collect(),
        PieceKind::King => ORTHOGONAL
            .iter()
            .chain(DIAGONAL.iter())
            .map(|&(dx, dy)| MoveRule::step(dx, dy))
            .collect(),
    }
}

// ============================================================================
// MOVE GENERATION
// ============================================================================

/// Destinations reachable from `from` for a piece of `color` using `rules`
///
/// The result holds each coordinate at most once, in discovery order.
pub fn valid_tiles(rules: &[MoveRule], from: Coord, board: &Board, color: Color) -> Vec<Coord> {
    let mut out = Vec::new();
    for rule in rules {
        walk_rule(rule, from, board, color, &mut out);
    }
    out
}

fn walk_rule(rule: &MoveRule, from: Coord, board: &Board, color: Color, out: &mut Vec<Coord>) {
    if rule.dx == 0 && rule.dy == 0 {
        return;
    }
    let max = rule.max_distance.max(1);
    let mut distance: u32 = 1;
    while distance <= max {
        let target = from.offset(rule.dx, rule.dy, distance as i32);
        if !board.contains(target) {
            break;
        }
        match board.piece_at(target) {
            None => {
                if !rule.must_capture {
                    push_unique(out, target);
                }
            }
            Some(occupant) if occupant.color == color => break,
            Some(_) => {
                if !rule.cannot_capture {
                    push_unique(out, target);
                }
                if !rule.can_jump {
                    break;
                }
            }
        }
        distance += 1;
    }
}

pub(crate) fn push_unique(out: &mut Vec<Coord>, coord: Coord) {
    if !out.contains(&coord) {
        out.push(coord);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::Piece;

    fn put(board: &mut Board, kind: PieceKind, color: Color, at: &str) {
        let id = board.push_piece(Piece::new(kind, color, standard_rules(kind, color)));
        board.place(id, at.parse().unwrap()).unwrap();
    }

    fn c(s: &str) -> Coord {
        s.parse().unwrap()
    }

    #[test]
    fn test_zero_distance_clamps_to_one() {
        assert_eq!(MoveRule::new(1, 0, 0).max_distance, 1);
    }

    #[test]
    fn test_slide_stops_at_edge() {
        let board = Board::new(8, 8).unwrap();
        let rules = standard_rules(PieceKind::Rook, Color::White);
        let tiles = valid_tiles(&rules, c("d4"), &board, Color::White);
        assert_eq!(tiles.len(), 14);
        assert!(tiles.iter().all(|&t| board.contains(t)));
    }

    #[test]
    fn test_slide_captures_then_stops() {
        let mut board = Board::new(8, 8).unwrap();
        put(&mut board, PieceKind::Pawn, Color::Black, "d6");
        let tiles = valid_tiles(&[MoveRule::slide(0, 1)], c("d4"), &board, Color::White);
        assert_eq!(tiles, vec![c("d5"), c("d6")]);
    }

    #[test]
    fn test_jumping_rule_passes_enemies_but_not_friends() {
        let mut board = Board::new(8, 8).unwrap();
        put(&mut board, PieceKind::Pawn, Color::Black, "a3");
        put(&mut board, PieceKind::Pawn, Color::White, "a5");
        let rule = MoveRule::slide(0, 1).jumping();
        let tiles = valid_tiles(&[rule], c("a1"), &board, Color::White);
        assert_eq!(tiles, vec![c("a2"), c("a3"), c("a4")]);
    }

    #[test]
    fn test_knight_in_corner() {
        let mut board = Board::new(8, 8).unwrap();
        put(&mut board, PieceKind::Pawn, Color::White, "b2");
        let rules = standard_rules(PieceKind::Knight, Color::White);
        let tiles = valid_tiles(&rules, c("a1"), &board, Color::White);
        assert_eq!(tiles.len(), 2);
        assert!(tiles.contains(&c("b3")));
        assert!(tiles.contains(&c("c2")));
    }

    #[test]
    fn test_pawn_push_cannot_capture() {
        let mut board = Board::new(8, 8).unwrap();
        put(&mut board, PieceKind::Pawn, Color::Black, "e5");
        let tiles = valid_tiles(&pawn_rules(Color::White), c("e4"), &board, Color::White);
        assert!(tiles.is_empty());
    }

    #[test]
    fn test_must_capture_skips_empty_squares() {
        let board = Board::new(8, 8).unwrap();
        let tiles = valid_tiles(&pawn_rules(Color::Black), c("e5"), &board, Color::Black);
        assert_eq!(tiles, vec![c("e4")]);
    }

    #[test]
    fn test_extended_saturates() {
        assert_eq!(MoveRule::slide(1, 0).extended(1).max_distance, UNBOUNDED);
        assert_eq!(MoveRule::step(1, 0).extended(1).max_distance, 2);
    }
}
