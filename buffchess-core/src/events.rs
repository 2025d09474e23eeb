//! Events published to renderers, move logs and selection dialogs
//!
//! Collaborators never touch game state; they drain these events and read
//! the board for display.

use serde::Serialize;

use crate::board::Coord;
use crate::history::MoveOutcome;
use crate::pieces::{Color, PieceId, PieceKind};
use crate::state::GameState;

/// Something the outside world may want to react to
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GameEvent {
    TileCreated {
        coord: Coord,
        white: bool,
    },
    PieceCreated {
        piece: PieceId,
        kind: PieceKind,
        color: Color,
        coord: Coord,
    },
    PieceDestroyed {
        piece: PieceId,
        coord: Coord,
    },
    PieceRevived {
        piece: PieceId,
        coord: Coord,
    },
    MoveCompleted {
        piece: PieceId,
        from: Coord,
        to: Coord,
        outcome: MoveOutcome,
        captured: Vec<PieceId>,
    },
    /// One line for the slide-up move log
    Notification(String),
    /// Per-king check status, for highlighting
    Check {
        king: PieceId,
        in_check: bool,
    },
    PromotionRequested(PromotionRequest),
    GameEnded(GameState),
}

/// Pending promotion awaiting a choice from a selection dialog
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PromotionRequest {
    pub piece: PieceId,
    pub coord: Coord,
    pub color: Color,
    pub candidates: Vec<PieceKind>,
    pub tooltips: Vec<String>,
    pub title: String,
    pub confirm: String,
}
