//! Move history and the change journal backing undo
//!
//! Each executed move is stored with the list of primitive changes it made
//! to the board. Undoing a move replays that list backwards, so undo never
//! re-runs game logic and no buff can trigger while a move is reverted.

use serde::Serialize;

use crate::board::{Clock, Coord};
use crate::buffs::Buff;
use crate::pieces::{Color, PieceId, PieceKind};

/// One reversible mutation, holding the value it replaced
#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    Occupant { coord: Coord, old: Option<PieceId> },
    PieceTile { piece: PieceId, old: Option<Coord> },
    Active { piece: PieceId, old: bool },
    Downed { piece: PieceId, old: Option<Coord> },
    Lives { piece: PieceId, old: i32 },
    Strength { piece: PieceId, old: i32 },
    HasMoved { piece: PieceId, old: bool },
    PieceBuff { piece: PieceId, index: usize, old: Box<Buff> },
    PieceBuffAdded { piece: PieceId, index: usize },
    TileBuff { coord: Coord, index: usize, old: Box<Buff> },
    TileBuffAdded { coord: Coord, index: usize },
    TileBuffRemoved { coord: Coord, index: usize, buff: Box<Buff> },
    Spawned { piece: PieceId },
    Clock { old: Clock },
}

/// How a move resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MoveOutcome {
    /// The piece reached its destination
    Moved,
    /// The defender survived the hit and the attacker stayed put
    Repelled { defender: PieceId },
    /// A guard on the destination sent the attacker back
    Reversed,
}

/// One executed move
#[derive(Clone, Debug)]
pub struct MoveRecord {
    pub piece: PieceId,
    pub kind: PieceKind,
    pub color: Color,
    pub from: Coord,
    pub to: Coord,
    /// Every piece the move destroyed
    pub captured: Vec<PieceId>,
    pub was_white_turn: bool,
    pub outcome: MoveOutcome,
    /// Whether committing the move flipped the side to move
    pub(crate) flipped_turn: bool,
    pub(crate) changes: Vec<Change>,
}

impl MoveRecord {
    pub fn is_capture(&self) -> bool {
        !self.captured.is_empty()
    }
}

/// Stack of executed moves, newest last
#[derive(Clone, Debug, Default)]
pub struct MoveHistory {
    records: Vec<MoveRecord>,
}

impl MoveHistory {
    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<MoveRecord> {
        self.records.pop()
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut MoveRecord> {
        self.records.last_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MoveRecord> + '_ {
        self.records.iter()
    }
}
