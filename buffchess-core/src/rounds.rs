//! Enemy rounds: hand-authored layouts and the level-based generator

use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::board::Coord;
use crate::error::GameError;
use crate::game::Game;
use crate::pieces::{Color, PieceId, PieceKind};

/// Largest generated army
const MAX_GENERATED_PIECES: i64 = 16;

/// Ranks generated pieces are placed on
const GENERATED_RANKS: [i32; 3] = [6, 7, 8];

/// A named enemy army
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyRound {
    pub name: String,
    /// Piece types and squares in algebraic notation
    pub pieces: Vec<(PieceKind, String)>,
}

impl EnemyRound {
    fn from_table(name: &str, pieces: &[(PieceKind, &str)]) -> Self {
        Self {
            name: name.to_string(),
            pieces: pieces
                .iter()
                .map(|&(kind, at)| (kind, at.to_string()))
                .collect(),
        }
    }

    /// Every hand-authored round, in campaign order
    pub fn database() -> Vec<EnemyRound> {
        use PieceKind::{Bishop as B, King as K, Knight as N, Pawn as P, Queen as Q, Rook as R};

        #[rustfmt::skip]
        let table: [(&str, &[(PieceKind, &str)]); 20] = [
            ("The Siege Line", &[(K, "e8"), (R, "h8"), (B, "f8"), (N, "g7"), (P, "d6"), (P, "e7")]),
            ("Diagonal Doom", &[(K, "f8"), (B, "c8"), (B, "f7"), (N, "g6"), (P, "b6"), (P, "d7"), (P, "e6")]),
            ("Cavalry Charge", &[(K, "e8"), (N, "b8"), (N, "f8"), (N, "g6"), (P, "a7"), (P, "d6"), (P, "f7")]),
            ("Rook Fortress", &[(K, "d8"), (R, "a8"), (R, "h8"), (P, "a7"), (P, "c7"), (P, "d6"), (P, "f7"), (P, "h6")]),
            ("Queen's Entry", &[(K, "e8"), (Q, "d8"), (P, "b6"), (P, "c7"), (P, "e7"), (P, "g6")]),
            ("Domino Breakers", &[(K, "e8"), (B, "c8"), (N, "g7"), (P, "a7"), (P, "d6"), (P, "e6"), (P, "f7"), (P, "h6")]),
            ("The Crescent", &[(K, "e8"), (R, "h8"), (B, "c7"), (N, "f6"), (P, "a6"), (P, "b7"), (P, "e7"), (P, "g6")]),
            ("Skyhook", &[(K, "e8"), (Q, "d8"), (R, "h8"), (B, "c8"), (N, "f6"), (P, "a7"), (P, "c6"), (P, "d6"), (P, "g7")]),
            ("Trap Door", &[(K, "e8"), (Q, "f7"), (N, "c6"), (N, "g8"), (P, "b6"), (P, "e6"), (P, "h7")]),
            ("Lurkers", &[(K, "d8"), (R, "a8"), (B, "c7"), (B, "f8"), (N, "b8"), (N, "g6"), (P, "d6"), (P, "f6")]),
            ("Royal Guard", &[(K, "e8"), (Q, "d8"), (R, "h8"), (B, "c7"), (N, "f6"), (P, "a6"), (P, "b7"), (P, "e6"), (P, "g7")]),
            ("Scorched Field", &[(K, "e8"), (Q, "f8"), (R, "a8"), (R, "h7"), (N, "d6"), (P, "a7"), (P, "c6"), (P, "e6"), (P, "f7"), (P, "g6")]),
            ("Knights of Ruin", &[(K, "e8"), (N, "b6"), (N, "c8"), (N, "f6"), (N, "g8"), (P, "a7"), (P, "b7"), (P, "f7"), (P, "h6")]),
            ("Linebreakers", &[(K, "d8"), (R, "a8"), (R, "h8"), (B, "c7"), (B, "f7"), (P, "a6"), (P, "b7"), (P, "d6"), (P, "f6"), (P, "h6")]),
            ("Queen's Wrath", &[(K, "e8"), (Q, "d8"), (Q, "f7"), (P, "a7"), (P, "c6"), (P, "d6"), (P, "h6")]),
            ("The Swarm", &[(K, "e8"), (R, "a8"), (B, "f8"), (N, "g7"), (P, "a7"), (P, "b7"), (P, "c6"), (P, "d6"), (P, "e6"), (P, "f7")]),
            ("The Full Court", &[(K, "e8"), (Q, "d8"), (R, "a8"), (R, "h8"), (B, "c8"), (B, "f8"), (N, "b8"), (N, "g8"), (P, "a7"), (P, "c7"), (P, "d6"), (P, "f7"), (P, "h6")]),
            ("Twin Queens", &[(K, "e8"), (Q, "d8"), (Q, "e7"), (P, "b6"), (P, "c6"), (P, "f6"), (P, "g6"), (P, "g7")]),
            ("The Iron Mask", &[(K, "e8"), (R, "a8"), (R, "h8"), (B, "c8"), (B, "f8"), (N, "b6"), (N, "g7"), (P, "a6"), (P, "c6"), (P, "d7"), (P, "f6"), (P, "h6")]),
            ("Final Boss: Dread Throne", &[(K, "e8"), (Q, "d8"), (Q, "e7"), (R, "a8"), (R, "h8"), (B, "c8"), (B, "f8"), (N, "b6"), (N, "g6"), (P, "a7"), (P, "b7"), (P, "c6"), (P, "d6"), (P, "f7"), (P, "g7"), (P, "h6")]),
        ];
        table
            .iter()
            .map(|(name, pieces)| EnemyRound::from_table(name, pieces))
            .collect()
    }

    /// Look up a hand-authored round by name, ignoring case
    pub fn find(name: &str) -> Option<EnemyRound> {
        Self::database()
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Round for a 1-based campaign level; past the database it is generated
    pub fn for_level<R: Rng>(level: u32, rng: &mut R) -> EnemyRound {
        let mut rounds = Self::database();
        match level as usize {
            0 => rounds.swap_remove(0),
            n if n <= rounds.len() => rounds.swap_remove(n - 1),
            _ => generate_enemy_round(level, rng),
        }
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Random army for `level`, king first, on ranks 6 to 8
pub fn generate_enemy_round<R: Rng>(level: u32, rng: &mut R) -> EnemyRound {
    let count = (5 + (i64::from(level) - 30) / 3).clamp(1, MAX_GENERATED_PIECES);
    let mut occupied = FxHashSet::default();
    let mut pieces = Vec::with_capacity(count as usize);

    pieces.push((PieceKind::King, random_square(rng, &mut occupied)));
    for _ in 1..count {
        let kind = weighted_kind(level, rng);
        pieces.push((kind, random_square(rng, &mut occupied)));
    }

    EnemyRound {
        name: format!("Level {level}"),
        pieces,
    }
}

fn weighted_kind<R: Rng>(level: u32, rng: &mut R) -> PieceKind {
    let over = level as f32 - 30.0;
    let queen = (over * 0.01).clamp(0.0, 1.0);
    let rook = (over * 0.008).clamp(0.0, 1.0);
    let bishop = 0.15;
    let knight = 0.15;

    let roll: f32 = rng.gen();
    if roll < queen {
        PieceKind::Queen
    } else if roll < queen + rook {
        PieceKind::Rook
    } else if roll < queen + rook + bishop {
        PieceKind::Bishop
    } else if roll < queen + rook + bishop + knight {
        PieceKind::Knight
    } else {
        PieceKind::Pawn
    }
}

fn random_square<R: Rng>(rng: &mut R, occupied: &mut FxHashSet<Coord>) -> String {
    loop {
        let file = rng.gen_range(0..8);
        let rank = GENERATED_RANKS[rng.gen_range(0..GENERATED_RANKS.len())];
        let at = Coord::new(file, rank - 1);
        if occupied.insert(at) {
            return at.to_string();
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl Game {
    /// Spawn a round's army for `color`
    ///
    /// Squares that are off the board, malformed or already taken are
    /// skipped with a warning.
    pub fn load_enemy_round(
        &mut self,
        round: &EnemyRound,
        color: Color,
    ) -> Result<Vec<PieceId>, GameError> {
        let mut spawned = Vec::with_capacity(round.pieces.len());
        for (kind, square) in &round.pieces {
            let at: Coord = square.parse()?;
            match self.spawn_piece(*kind, color, at, None) {
                Ok(id) => spawned.push(id),
                Err(e) => tracing::warn!(%e, round = %round.name, "enemy piece skipped"),
            }
        }
        tracing::debug!(round = %round.name, pieces = spawned.len(), "enemy round loaded");
        Ok(spawned)
    }
}
