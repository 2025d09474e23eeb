//! Piece model and combat resolution

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Coord;
use crate::buffs::Buff;
use crate::rules::MoveRule;

/// Default life total for a freshly spawned piece
pub const DEFAULT_LIVES: i32 = 1;

/// Default damage dealt by a piece in combat
pub const DEFAULT_STRENGTH: i32 = 1;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Handle to a piece in the board's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl PieceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side colour
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction pawns advance in
    pub fn forward(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn is_white(self) -> bool {
        self == Color::White
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

/// Piece type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
    Custom,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::Pawn,
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
        PieceKind::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Rook => "Rook",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
            PieceKind::Custom => "Custom",
        }
    }

    /// FEN-style letter, uppercase for White
    pub fn symbol(self, color: Color) -> char {
        let c = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
            PieceKind::Custom => 'c',
        };
        if color.is_white() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// Queen or rook
    pub fn is_major(self) -> bool {
        matches!(self, PieceKind::Queen | PieceKind::Rook)
    }
}

// ============================================================================
// PIECE
// ============================================================================

/// Runtime state of one piece
///
/// Pieces are never freed during a game. A destroyed piece is inactive with
/// no tile and can be revived.
#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub color: Color,
    pub lives: i32,
    pub strength: i32,
    pub rules: Vec<MoveRule>,
    pub buffs: Vec<Buff>,
    pub tile: Option<Coord>,
    pub active: bool,
    pub has_moved: bool,
}

impl Piece {
    /// Off-board piece with default stats and no buffs
    pub fn new(kind: PieceKind, color: Color, rules: Vec<MoveRule>) -> Self {
        Self {
            id: PieceId(u32::MAX),
            kind,
            color,
            lives: DEFAULT_LIVES,
            strength: DEFAULT_STRENGTH,
            rules,
            buffs: Vec::new(),
            tile: None,
            active: false,
            has_moved: false,
        }
    }

    pub fn with_stats(mut self, lives: i32, strength: i32) -> Self {
        self.lives = lives;
        self.strength = strength;
        self
    }

    pub fn with_buffs(mut self, buffs: Vec<Buff>) -> Self {
        self.buffs = buffs;
        self
    }

    /// Buffs that still take part in generation and updates
    pub fn active_buffs(&self) -> impl Iterator<Item = &Buff> + '_ {
        self.buffs.iter().filter(|b| b.active)
    }

    /// "White Knight" style label for move logs
    pub fn label(&self) -> String {
        format!("{} {}", self.color.name(), self.kind.name())
    }
}

// ============================================================================
// COMBAT
// ============================================================================

/// Apply `damage` to a life total, returning the new total and whether the
/// piece is destroyed
pub fn resolve_hit(lives: i32, damage: i32) -> (i32, bool) {
    let remaining = (lives - damage).max(0);
    (remaining, remaining <= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_hit() {
        assert_eq!(resolve_hit(1, 2), (0, true));
        assert_eq!(resolve_hit(3, 1), (2, false));
        assert_eq!(resolve_hit(1, 1), (0, true));
        assert_eq!(resolve_hit(2, 0), (2, false));
    }

    #[test]
    fn test_colour_helpers() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.forward(), -1);
        assert_eq!(PieceKind::Knight.symbol(Color::White), 'N');
        assert_eq!(PieceKind::Knight.symbol(Color::Black), 'n');
    }

    #[test]
    fn test_new_piece_defaults() {
        let p = Piece::new(PieceKind::Queen, Color::Black, Vec::new());
        assert_eq!(p.lives, DEFAULT_LIVES);
        assert_eq!(p.strength, DEFAULT_STRENGTH);
        assert!(!p.active);
        assert!(p.tile.is_none());
        assert_eq!(p.label(), "Black Queen");
    }
}
