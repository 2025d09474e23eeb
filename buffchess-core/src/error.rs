//! Error taxonomy for the game core
//!
//! Every error here is recovered locally: operations report them through
//! their return value and log them, nothing unwinds across the core
//! boundary. "No legal moves" is not an error at all; it is reported as a
//! terminal [`GameState`](crate::state::GameState).

use crate::board::Coord;
use crate::pieces::{PieceId, PieceKind};

/// Errors returned by game operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // Invalid references
    #[error("no tile at {0}")]
    NoSuchTile(Coord),

    #[error("no piece with handle {0}")]
    NoSuchPiece(PieceId),

    #[error("piece {0} is not on the board")]
    PieceInactive(PieceId),

    #[error("tile {0} is already occupied")]
    TileOccupied(Coord),

    #[error("{to} is not a legal destination for piece {piece}")]
    IllegalDestination { piece: PieceId, to: Coord },

    #[error("invalid coordinate notation '{0}'")]
    BadNotation(String),

    #[error("a revived piece needs at least one life, got {0}")]
    InvalidLives(i32),

    // Promotion flow
    #[error("a promotion choice is pending")]
    PromotionPending,

    #[error("no promotion is pending")]
    NoPendingPromotion,

    #[error("{0:?} is not a promotion candidate")]
    NotACandidate(PieceKind),

    // Configuration
    #[error("invalid board dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("traditional setup requires an 8x8 board, found {width}x{height}")]
    NonStandardBoard { width: i32, height: i32 },

    #[error("unknown enemy round '{0}'")]
    UnknownRound(String),
}

/// Errors raised inside buff dispatch
///
/// These never leave the move pipeline: the game logs them and skips the
/// offending buff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuffError {
    #[error("buff '{buff}' expects a {expected}, got a {got}")]
    InvalidArgument {
        buff: String,
        expected: &'static str,
        got: &'static str,
    },
}
