//! Static position evaluation
//!
//! Scores are computed from White's point of view (positive favours White)
//! and flipped for Black. Evaluation only reads the game; it never probes
//! moves.

use serde::{Deserialize, Serialize};

use crate::board::Coord;
use crate::game::Game;
use crate::pieces::{Color, Piece, PieceKind};

/// Bonus for giving check, doubled as a king safety penalty
pub const CHECK_BONUS: i32 = 50;

// ============================================================================
// HEURISTICS
// ============================================================================

/// Material values per piece type, in centipawns
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceValues {
    pub pawn: i32,
    pub knight: i32,
    pub bishop: i32,
    pub rook: i32,
    pub queen: i32,
    pub king: i32,
    pub custom: i32,
}

impl Default for PieceValues {
    fn default() -> Self {
        Self {
            pawn: 100,
            knight: 320,
            bishop: 330,
            rook: 500,
            queen: 900,
            king: 20000,
            custom: 200,
        }
    }
}

impl PieceValues {
    pub fn of(&self, kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => self.pawn,
            PieceKind::Knight => self.knight,
            PieceKind::Bishop => self.bishop,
            PieceKind::Rook => self.rook,
            PieceKind::Queen => self.queen,
            PieceKind::King => self.king,
            PieceKind::Custom => self.custom,
        }
    }
}

/// Evaluation weights
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub piece_values: PieceValues,
    /// Per legal move
    pub mobility_weight: i32,
    /// Charged to a side whose king is attacked
    pub check_penalty: i32,
    /// Per destination holding an enemy piece
    pub aggression: i32,
    /// Per destination that is empty or friendly
    pub defense: i32,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            piece_values: PieceValues::default(),
            mobility_weight: 10,
            check_penalty: CHECK_BONUS * 2,
            aggression: 5,
            defense: 3,
        }
    }
}

// ============================================================================
// PIECE-SQUARE TABLES
// ============================================================================

// Rows run from rank 8 down to rank 1, seen from White's side.

#[rustfmt::skip]
const PAWN_TABLE: [[i32; 8]; 8] = [
    [  0,   0,   0,   0,   0,   0,   0,   0],
    [ 50,  50,  50,  50,  50,  50,  50,  50],
    [ 10,  10,  20,  30,  30,  20,  10,  10],
    [  5,   5,  10,  25,  25,  10,   5,   5],
    [  0,   0,   0,  20,  20,   0,   0,   0],
    [  5,  -5, -10,   0,   0, -10,  -5,   5],
    [  5,  10,  10, -20, -20,  10,  10,   5],
    [  0,   0,   0,   0,   0,   0,   0,   0],
];

#[rustfmt::skip]
const KNIGHT_TABLE: [[i32; 8]; 8] = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20,   0,   0,   0,   0, -20, -40],
    [-30,   0,  10,  15,  15,  10,   0, -30],
    [-30,   5,  15,  20,  20,  15,   5, -30],
    [-30,   0,  15,  20,  20,  15,   0, -30],
    [-30,   5,  10,  15,  15,  10,   5, -30],
    [-40, -20,   0,   5,   5,   0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

#[rustfmt::skip]
const BISHOP_TABLE: [[i32; 8]; 8] = [
    [-20, -10, -10, -10, -10, -10, -10, -20],
    [-10,   0,   0,   0,   0,   0,   0, -10],
    [-10,   0,   5,  10,  10,   5,   0, -10],
    [-10,   5,   5,  10,  10,   5,   5, -10],
    [-10,   0,  10,  10,  10,  10,   0, -10],
    [-10,  10,  10,  10,  10,  10,  10, -10],
    [-10,   5,   0,   0,   0,   0,   5, -10],
    [-20, -10, -10, -10, -10, -10, -10, -20],
];

#[rustfmt::skip]
const ROOK_TABLE: [[i32; 8]; 8] = [
    [  0,   0,   0,   0,   0,   0,   0,   0],
    [  5,  10,  10,  10,  10,  10,  10,   5],
    [ -5,   0,   0,   0,   0,   0,   0,  -5],
    [ -5,   0,   0,   0,   0,   0,   0,  -5],
    [ -5,   0,   0,   0,   0,   0,   0,  -5],
    [ -5,   0,   0,   0,   0,   0,   0,  -5],
    [ -5,   0,   0,   0,   0,   0,   0,  -5],
    [  0,   0,   0,   5,   5,   0,   0,   0],
];

#[rustfmt::skip]
const QUEEN_TABLE: [[i32; 8]; 8] = [
    [-20, -10, -10,  -5,  -5, -10, -10, -20],
    [-10,   0,   0,   0,   0,   0,   0, -10],
    [-10,   0,   5,   5,   5,   5,   0, -10],
    [ -5,   0,   5,   5,   5,   5,   0,  -5],
    [  0,   0,   5,   5,   5,   5,   0,  -5],
    [-10,   5,   5,   5,   5,   5,   0, -10],
    [-10,   0,   5,   0,   0,   0,   0, -10],
    [-20, -10, -10,  -5,  -5, -10, -10, -20],
];

#[rustfmt::skip]
const KING_MIDDLE_TABLE: [[i32; 8]; 8] = [
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-20, -30, -30, -40, -40, -30, -30, -20],
    [-10, -20, -20, -20, -20, -20, -20, -10],
    [ 20,  20,   0,   0,   0,   0,  20,  20],
    [ 20,  30,  10,   0,   0,  10,  30,  20],
];

#[rustfmt::skip]
const KING_END_TABLE: [[i32; 8]; 8] = [
    [-50, -40, -30, -20, -20, -30, -40, -50],
    [-30, -20, -10,   0,   0, -10, -20, -30],
    [-30, -10,  20,  30,  30,  20, -10, -30],
    [-30, -10,  30,  40,  40,  30, -10, -30],
    [-30, -10,  30,  40,  40,  30, -10, -30],
    [-30, -10,  20,  30,  30,  20, -10, -30],
    [-30, -30,   0,   0,   0,   0, -30, -30],
    [-50, -30, -30, -30, -30, -30, -30, -50],
];

/// Move-ordering preference for central destinations
#[rustfmt::skip]
pub const CENTER_TABLE: [[i32; 8]; 8] = [
    [0, 1, 2, 3, 3, 2, 1, 0],
    [1, 2, 3, 4, 4, 3, 2, 1],
    [2, 3, 4, 5, 5, 4, 3, 2],
    [3, 4, 5, 6, 6, 5, 4, 3],
    [3, 4, 5, 6, 6, 5, 4, 3],
    [2, 3, 4, 5, 5, 4, 3, 2],
    [1, 2, 3, 4, 4, 3, 2, 1],
    [0, 1, 2, 3, 3, 2, 1, 0],
];

fn clamp8(v: i32) -> usize {
    v.clamp(0, 7) as usize
}

/// Table lookup for a square, mirrored so each side reads from its own end
fn table_value(table: &[[i32; 8]; 8], color: Color, at: Coord) -> i32 {
    let row = match color {
        Color::White => 7 - clamp8(at.y),
        Color::Black => clamp8(at.y),
    };
    table[row][clamp8(at.x)]
}

/// Center preference of a destination; larger boards are clamped
pub fn center_bonus(at: Coord) -> i32 {
    CENTER_TABLE[clamp8(at.y)][clamp8(at.x)]
}

/// Positional bonus for a piece where it stands
pub fn position_bonus(piece: &Piece, endgame: bool) -> i32 {
    let Some(at) = piece.tile else {
        return 0;
    };
    let table = match piece.kind {
        PieceKind::Pawn => &PAWN_TABLE,
        PieceKind::Knight => &KNIGHT_TABLE,
        PieceKind::Bishop => &BISHOP_TABLE,
        PieceKind::Rook => &ROOK_TABLE,
        PieceKind::Queen => &QUEEN_TABLE,
        PieceKind::King if endgame => &KING_END_TABLE,
        PieceKind::King => &KING_MIDDLE_TABLE,
        PieceKind::Custom => return 0,
    };
    table_value(table, piece.color, at)
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Few pieces left, or at most two queens and rooks between both sides
pub fn is_endgame(game: &Game) -> bool {
    let mut pieces = 0;
    let mut majors = 0;
    for p in game.board().active_pieces() {
        pieces += 1;
        if p.kind.is_major() {
            majors += 1;
        }
    }
    pieces <= 10 || majors <= 2
}

fn sign(color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Static score of the position from `perspective`'s point of view
pub fn evaluate_position(game: &Game, perspective: Color, heuristics: &Heuristics) -> i32 {
    sign(perspective) * evaluate_white(game, heuristics)
}

fn evaluate_white(game: &Game, h: &Heuristics) -> i32 {
    let endgame = is_endgame(game);
    let board = game.board();
    let mut score = 0;

    for piece in board.active_pieces() {
        let value = h.piece_values.of(piece.kind) + position_bonus(piece, endgame);
        score += sign(piece.color) * value;
    }

    for color in [Color::White, Color::Black] {
        let s = sign(color);
        for piece in board.pieces_of(color) {
            for to in game.valid_tiles(piece.id) {
                score += s * h.mobility_weight;
                let hits_enemy = board.piece_at(to).is_some_and(|p| p.color != color);
                score += s * if hits_enemy { h.aggression } else { h.defense };
            }
        }
        if game.is_in_check(color) {
            score -= s * h.check_penalty;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Coord {
        s.parse().unwrap()
    }

    #[test]
    fn test_opening_is_balanced() {
        let game = Game::standard().unwrap();
        let h = Heuristics::default();
        assert_eq!(evaluate_position(&game, Color::White, &h), 0);
        assert_eq!(evaluate_position(&game, Color::Black, &h), 0);
    }

    #[test]
    fn test_material_advantage() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::Queen, Color::White, c("d1"), None).unwrap();
        game.spawn_piece(PieceKind::Pawn, Color::Black, c("a7"), None).unwrap();
        let h = Heuristics::default();
        let white = evaluate_position(&game, Color::White, &h);
        assert!(white > 700);
        assert_eq!(evaluate_position(&game, Color::Black, &h), -white);
    }

    #[test]
    fn test_tables_are_mirrored() {
        let white = Piece::new(PieceKind::Pawn, Color::White, Vec::new());
        let black = Piece::new(PieceKind::Pawn, Color::Black, Vec::new());
        let on = |mut p: Piece, at: &str| {
            p.tile = Some(c(at));
            position_bonus(&p, false)
        };
        assert_eq!(on(white.clone(), "d7"), 50);
        assert_eq!(on(black.clone(), "d2"), 50);
        assert_eq!(on(white, "e2"), on(black, "e7"));
    }

    #[test]
    fn test_check_costs_the_checked_side() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("e1"), None).unwrap();
        game.spawn_piece(PieceKind::King, Color::Black, c("a8"), None).unwrap();
        let quiet = Heuristics {
            mobility_weight: 0,
            aggression: 0,
            defense: 0,
            ..Default::default()
        };
        let before = evaluate_position(&game, Color::White, &quiet);
        game.spawn_piece(PieceKind::Rook, Color::Black, c("e8"), None).unwrap();
        let after = evaluate_position(&game, Color::White, &quiet);
        let placed = game.board().piece_at(c("e8")).unwrap();
        let rook = quiet.piece_values.rook + position_bonus(placed, true);
        assert_eq!(before - after, rook + quiet.check_penalty);
    }

    #[test]
    fn test_endgame_detection() {
        assert!(!is_endgame(&Game::standard().unwrap()));
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("e1"), None).unwrap();
        assert!(is_endgame(&game));
    }

    #[test]
    fn test_center_bonus_clamps() {
        assert_eq!(center_bonus(c("d4")), 6);
        assert_eq!(center_bonus(Coord::new(20, 20)), 0);
    }
}
