//! Board grid, tiles and the piece arena
//!
//! The board owns every piece for the lifetime of a game. Tiles only hold a
//! [`PieceId`] handle to their occupant and pieces hold the coordinate of
//! their tile; the two sides of that link are only ever changed together
//! through the mutators below, and every mutation made while a move is being
//! executed is written to the change journal so it can be reverted exactly.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::buffs::Buff;
use crate::error::GameError;
use crate::history::Change;
use crate::pieces::{Color, Piece, PieceId, PieceKind};

// ============================================================================
// COORDINATES
// ============================================================================

/// Board coordinate: `x` is the file (0 = a), `y` the rank (0 = rank 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate shifted by a vector scaled by `distance`
    pub fn offset(self, dx: i32, dy: i32, distance: i32) -> Self {
        Self::new(self.x + dx * distance, self.y + dy * distance)
    }

    /// The eight surrounding coordinates (may be off-board)
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(move |&(dx, dy)| Coord::new(self.x + dx, self.y + dy))
    }

    /// Light square parity
    pub fn is_white(self) -> bool {
        (self.x + self.y).rem_euclid(2) == 0
    }
}

/// King-step offsets, used for adjacency checks
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (0..26).contains(&self.x) {
            write!(f, "{}{}", (b'a' + self.x as u8) as char, self.y + 1)
        } else {
            write!(f, "({},{})", self.x, self.y)
        }
    }
}

impl FromStr for Coord {
    type Err = GameError;

    /// Parse algebraic notation such as `e4`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || GameError::BadNotation(s.to_string());
        let mut chars = s.trim().chars();
        let file = chars.next().ok_or_else(bad)?.to_ascii_lowercase();
        if !file.is_ascii_lowercase() {
            return Err(bad());
        }
        let rank: i32 = chars.as_str().parse().map_err(|_| bad())?;
        if rank < 1 {
            return Err(bad());
        }
        Ok(Coord::new(file as i32 - 'a' as i32, rank - 1))
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Turn and round counters that buff durations are reconciled against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Completed Black moves
    pub turn: u32,
    /// Rounds of the run
    pub round: u32,
    /// The next round start jumps one round further
    #[serde(default)]
    pub skip_round: bool,
}

// ============================================================================
// TILE
// ============================================================================

/// One cell of the grid
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub coord: Coord,
    pub white: bool,
    occupant: Option<PieceId>,
    pub(crate) buffs: Vec<Buff>,
}

impl Tile {
    fn new(coord: Coord) -> Self {
        Self {
            coord,
            white: coord.is_white(),
            occupant: None,
            buffs: Vec::new(),
        }
    }

    pub fn occupant(&self) -> Option<PieceId> {
        self.occupant
    }

    pub fn buffs(&self) -> &[Buff] {
        &self.buffs
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Grid of tiles plus the arena of every piece spawned this game
#[derive(Clone, Debug)]
pub struct Board {
    width: i32,
    height: i32,
    tiles: FxHashMap<Coord, Tile>,
    pieces: Vec<Piece>,
    /// Destroyed pieces and where they fell
    downed: FxHashMap<PieceId, Coord>,
    clock: Clock,
    journal: Vec<Change>,
    recording: bool,
}

/// Comparable view of every piece, used to check exact restoration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub pieces: Vec<(PieceId, PieceKind, Color, Option<Coord>, bool, i32, i32)>,
    pub occupancy: Vec<(Coord, PieceId)>,
}

impl Board {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Build an empty grid
    pub fn new(width: i32, height: i32) -> Result<Self, GameError> {
        if width <= 0 || height <= 0 {
            return Err(GameError::InvalidDimensions { width, height });
        }
        let mut tiles = FxHashMap::default();
        for y in 0..height {
            for x in 0..width {
                let coord = Coord::new(x, y);
                tiles.insert(coord, Tile::new(coord));
            }
        }
        Ok(Self {
            width,
            height,
            tiles,
            pieces: Vec::new(),
            downed: FxHashMap::default(),
            clock: Clock::default(),
            journal: Vec::new(),
            recording: false,
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    pub fn tile(&self, coord: Coord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    /// Tiles in rank-major order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| self.tiles.get(&Coord::new(x, y)))
        })
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.index())
    }

    /// Active piece standing on `coord`
    pub fn piece_at(&self, coord: Coord) -> Option<&Piece> {
        self.tiles
            .get(&coord)
            .and_then(|t| t.occupant)
            .and_then(|id| self.piece(id))
            .filter(|p| p.active)
    }

    /// Every piece ever spawned, in spawn order
    pub fn all_pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Active pieces in spawn order
    pub fn active_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(|p| p.active)
    }

    /// Active pieces of one colour in spawn order
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = &Piece> + '_ {
        self.active_pieces().filter(move |p| p.color == color)
    }

    pub fn kings(&self, color: Color) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces_of(color).filter(|p| p.kind == PieceKind::King)
    }

    pub fn is_downed(&self, id: PieceId) -> bool {
        self.downed.contains_key(&id)
    }

    pub fn downed(&self) -> impl Iterator<Item = (PieceId, Coord)> + '_ {
        self.downed.iter().map(|(&id, &c)| (id, c))
    }

    // ========================================================================
    // JOURNAL
    // ========================================================================

    /// Start journalling mutations
    pub(crate) fn begin_journal(&mut self) {
        self.journal.clear();
        self.recording = true;
    }

    /// Stop journalling and hand back everything recorded
    pub(crate) fn end_journal(&mut self) -> Vec<Change> {
        self.recording = false;
        std::mem::take(&mut self.journal)
    }

    /// Revert every journalled change made after `mark`
    pub(crate) fn rollback_to(&mut self, mark: usize) {
        while self.journal.len() > mark {
            if let Some(change) = self.journal.pop() {
                self.revert(change);
            }
        }
    }

    /// Revert a whole journal, newest change first
    pub(crate) fn revert_all(&mut self, changes: Vec<Change>) {
        for change in changes.into_iter().rev() {
            self.revert(change);
        }
    }

    fn record(&mut self, change: Change) {
        if self.recording {
            self.journal.push(change);
        }
    }

    fn revert(&mut self, change: Change) {
        match change {
            Change::Occupant { coord, old } => {
                if let Some(tile) = self.tiles.get_mut(&coord) {
                    tile.occupant = old;
                }
            }
            Change::PieceTile { piece, old } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    p.tile = old;
                }
            }
            Change::Active { piece, old } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    p.active = old;
                }
            }
            Change::Downed { piece, old } => match old {
                Some(at) => {
                    self.downed.insert(piece, at);
                }
                None => {
                    self.downed.remove(&piece);
                }
            },
            Change::Lives { piece, old } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    p.lives = old;
                }
            }
            Change::Strength { piece, old } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    p.strength = old;
                }
            }
            Change::HasMoved { piece, old } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    p.has_moved = old;
                }
            }
            Change::PieceBuff { piece, index, old } => {
                if let Some(slot) = self
                    .pieces
                    .get_mut(piece.index())
                    .and_then(|p| p.buffs.get_mut(index))
                {
                    *slot = *old;
                }
            }
            Change::PieceBuffAdded { piece, index } => {
                if let Some(p) = self.pieces.get_mut(piece.index()) {
                    if index < p.buffs.len() {
                        p.buffs.remove(index);
                    }
                }
            }
            Change::TileBuff { coord, index, old } => {
                if let Some(slot) = self
                    .tiles
                    .get_mut(&coord)
                    .and_then(|t| t.buffs.get_mut(index))
                {
                    *slot = *old;
                }
            }
            Change::TileBuffAdded { coord, index } => {
                if let Some(tile) = self.tiles.get_mut(&coord) {
                    if index < tile.buffs.len() {
                        tile.buffs.remove(index);
                    }
                }
            }
            Change::TileBuffRemoved { coord, index, buff } => {
                if let Some(tile) = self.tiles.get_mut(&coord) {
                    let index = index.min(tile.buffs.len());
                    tile.buffs.insert(index, *buff);
                }
            }
            Change::Spawned { piece } => self.unspawn(piece),
            Change::Clock { old } => {
                self.clock = old;
            }
        }
    }

    /// Drop a journalled spawn
    ///
    /// Ids are arena indices, so only the newest piece can be removed
    /// outright. An older slot is left behind as an inactive piece that no
    /// tile refers to.
    fn unspawn(&mut self, id: PieceId) {
        if id.index() + 1 == self.pieces.len() {
            self.pieces.pop();
            return;
        }
        if let Some(at) = self.pieces.get(id.index()).and_then(|p| p.tile) {
            if let Some(tile) = self.tiles.get_mut(&at) {
                if tile.occupant == Some(id) {
                    tile.occupant = None;
                }
            }
        }
        if let Some(p) = self.pieces.get_mut(id.index()) {
            p.tile = None;
            p.active = false;
        }
        self.downed.remove(&id);
    }

    // ========================================================================
    // PRIMITIVE MUTATORS (journalled)
    // ========================================================================

    fn set_occupant(&mut self, coord: Coord, occupant: Option<PieceId>) {
        if let Some(tile) = self.tiles.get_mut(&coord) {
            let old = std::mem::replace(&mut tile.occupant, occupant);
            self.record(Change::Occupant { coord, old });
        }
    }

    fn set_piece_tile(&mut self, id: PieceId, tile: Option<Coord>) {
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let old = std::mem::replace(&mut p.tile, tile);
            self.record(Change::PieceTile { piece: id, old });
        }
    }

    fn set_active(&mut self, id: PieceId, active: bool) {
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let old = std::mem::replace(&mut p.active, active);
            self.record(Change::Active { piece: id, old });
        }
    }

    fn set_downed(&mut self, id: PieceId, at: Option<Coord>) {
        let old = match at {
            Some(c) => self.downed.insert(id, c),
            None => self.downed.remove(&id),
        };
        self.record(Change::Downed { piece: id, old });
    }

    pub(crate) fn set_lives(&mut self, id: PieceId, lives: i32) {
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let old = std::mem::replace(&mut p.lives, lives);
            self.record(Change::Lives { piece: id, old });
        }
    }

    pub(crate) fn set_strength(&mut self, id: PieceId, strength: i32) {
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let old = std::mem::replace(&mut p.strength, strength);
            self.record(Change::Strength { piece: id, old });
        }
    }

    pub(crate) fn set_has_moved(&mut self, id: PieceId, moved: bool) {
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let old = std::mem::replace(&mut p.has_moved, moved);
            self.record(Change::HasMoved { piece: id, old });
        }
    }

    pub(crate) fn set_piece_buff(&mut self, id: PieceId, index: usize, buff: Buff) {
        if let Some(slot) = self
            .pieces
            .get_mut(id.index())
            .and_then(|p| p.buffs.get_mut(index))
        {
            let old = std::mem::replace(slot, buff);
            self.record(Change::PieceBuff {
                piece: id,
                index,
                old: Box::new(old),
            });
        }
    }

    pub(crate) fn push_piece_buff(&mut self, id: PieceId, buff: Buff) {
        let clock = self.clock;
        if let Some(p) = self.pieces.get_mut(id.index()) {
            let index = p.buffs.len();
            p.buffs.push(buff.attached_at(clock));
            self.record(Change::PieceBuffAdded { piece: id, index });
        }
    }

    pub(crate) fn set_tile_buff(&mut self, coord: Coord, index: usize, buff: Buff) {
        if let Some(slot) = self
            .tiles
            .get_mut(&coord)
            .and_then(|t| t.buffs.get_mut(index))
        {
            let old = std::mem::replace(slot, buff);
            self.record(Change::TileBuff {
                coord,
                index,
                old: Box::new(old),
            });
        }
    }

    pub(crate) fn push_tile_buff(&mut self, coord: Coord, buff: Buff) {
        let clock = self.clock;
        if let Some(tile) = self.tiles.get_mut(&coord) {
            let index = tile.buffs.len();
            tile.buffs.push(buff.attached_at(clock));
            self.record(Change::TileBuffAdded { coord, index });
        }
    }

    pub(crate) fn set_clock(&mut self, clock: Clock) {
        let old = std::mem::replace(&mut self.clock, clock);
        self.record(Change::Clock { old });
    }

    /// Add a piece to the arena, off-board and inactive
    pub(crate) fn push_piece(&mut self, mut piece: Piece) -> PieceId {
        let id = PieceId(self.pieces.len() as u32);
        piece.id = id;
        piece.tile = None;
        piece.active = false;
        let clock = self.clock;
        for buff in &mut piece.buffs {
            *buff = buff.clone().attached_at(clock);
        }
        self.pieces.push(piece);
        self.record(Change::Spawned { piece: id });
        id
    }

    // ========================================================================
    // COMPOSITE MUTATORS
    // ========================================================================

    /// Put an off-board piece onto an empty tile and activate it
    pub(crate) fn place(&mut self, id: PieceId, coord: Coord) -> Result<(), GameError> {
        let tile = self.tiles.get(&coord).ok_or(GameError::NoSuchTile(coord))?;
        if tile.occupant.is_some() {
            return Err(GameError::TileOccupied(coord));
        }
        if self.piece(id).is_none() {
            return Err(GameError::NoSuchPiece(id));
        }
        self.set_occupant(coord, Some(id));
        self.set_piece_tile(id, Some(coord));
        self.set_active(id, true);
        Ok(())
    }

    /// Move an active piece to another tile, vacating its old one
    pub(crate) fn relocate(&mut self, id: PieceId, to: Coord) {
        if let Some(from) = self.piece(id).and_then(|p| p.tile) {
            if self.tiles.get(&from).and_then(|t| t.occupant) == Some(id) {
                self.set_occupant(from, None);
            }
        }
        self.set_occupant(to, Some(id));
        self.set_piece_tile(id, Some(to));
    }

    /// Take a piece off the board and mark it downed
    pub(crate) fn destroy(&mut self, id: PieceId) {
        let Some(at) = self.piece(id).and_then(|p| p.tile) else {
            return;
        };
        if self.tiles.get(&at).and_then(|t| t.occupant) == Some(id) {
            self.set_occupant(at, None);
        }
        self.set_piece_tile(id, None);
        self.set_active(id, false);
        self.set_downed(id, Some(at));
        tracing::debug!(piece = %id, at = %at, "piece destroyed");
    }

    /// Take a piece off the board without marking it downed (promotion swap)
    pub(crate) fn retire(&mut self, id: PieceId) {
        if let Some(at) = self.piece(id).and_then(|p| p.tile) {
            if self.tiles.get(&at).and_then(|t| t.occupant) == Some(id) {
                self.set_occupant(at, None);
            }
        }
        self.set_piece_tile(id, None);
        self.set_active(id, false);
    }

    /// Bring a downed piece back on the tile where it fell
    pub(crate) fn revive(&mut self, id: PieceId, lives: i32) -> Result<Coord, GameError> {
        if lives <= 0 {
            return Err(GameError::InvalidLives(lives));
        }
        let at = *self.downed.get(&id).ok_or(GameError::NoSuchPiece(id))?;
        if self.piece_at(at).is_some() {
            return Err(GameError::TileOccupied(at));
        }
        self.set_downed(id, None);
        self.set_lives(id, lives);
        self.set_occupant(at, Some(id));
        self.set_piece_tile(id, Some(at));
        self.set_active(id, true);
        Ok(at)
    }

    /// Apply damage, destroying the piece when its lives run out
    pub(crate) fn damage(&mut self, id: PieceId, amount: i32) -> bool {
        let Some(piece) = self.piece(id) else {
            return false;
        };
        let (lives, destroyed) = crate::pieces::resolve_hit(piece.lives, amount);
        self.set_lives(id, lives);
        if destroyed {
            self.destroy(id);
        }
        destroyed
    }

    /// Resolve combat on a destination tile
    ///
    /// An empty destination always succeeds. An enemy defender loses lives
    /// equal to the attacker's strength and is destroyed once they reach
    /// zero; the return value tells whether the attacker may advance.
    pub(crate) fn fight(&mut self, defender: Option<PieceId>, attacker: PieceId) -> bool {
        let Some(defender) = defender else {
            return true;
        };
        let Some(strength) = self.piece(attacker).map(|p| p.strength) else {
            return false;
        };
        self.damage(defender, strength)
    }

    /// Drop spent tile buffs
    pub(crate) fn prune_tile_buffs(&mut self) {
        let spent: Vec<(Coord, usize)> = self
            .tiles()
            .flat_map(|t| {
                t.buffs
                    .iter()
                    .enumerate()
                    .rev()
                    .filter(|(_, b)| !b.active)
                    .map(move |(i, _)| (t.coord, i))
            })
            .collect();
        for (coord, index) in spent {
            if let Some(tile) = self.tiles.get_mut(&coord) {
                let buff = tile.buffs.remove(index);
                self.record(Change::TileBuffRemoved {
                    coord,
                    index,
                    buff: Box::new(buff),
                });
            }
        }
    }

    // ========================================================================
    // INTEGRITY
    // ========================================================================

    /// Check the tile/piece back-reference invariant
    pub fn is_consistent(&self) -> bool {
        let mut seen = rustc_hash::FxHashSet::default();
        for tile in self.tiles.values() {
            if let Some(id) = tile.occupant {
                let Some(piece) = self.piece(id) else {
                    return false;
                };
                if !piece.active || piece.tile != Some(tile.coord) || !seen.insert(id) {
                    return false;
                }
            }
        }
        self.pieces.iter().all(|p| match (p.active, p.tile) {
            (true, Some(c)) => self.tiles.get(&c).and_then(|t| t.occupant) == Some(p.id),
            (true, None) => false,
            (false, _) => p.tile.is_none(),
        })
    }

    /// Hash of everything that defines the position
    pub fn position_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.pieces.len().hash(&mut hasher);
        for p in &self.pieces {
            p.id.hash(&mut hasher);
            p.kind.hash(&mut hasher);
            p.color.hash(&mut hasher);
            p.tile.hash(&mut hasher);
            p.active.hash(&mut hasher);
            p.lives.hash(&mut hasher);
            p.strength.hash(&mut hasher);
            p.has_moved.hash(&mut hasher);
            for b in &p.buffs {
                b.active.hash(&mut hasher);
                b.was_used.hash(&mut hasher);
            }
        }
        for tile in self.tiles() {
            tile.buffs.len().hash(&mut hasher);
            for b in &tile.buffs {
                b.active.hash(&mut hasher);
            }
        }
        self.clock.turn.hash(&mut hasher);
        self.clock.round.hash(&mut hasher);
        hasher.finish()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            pieces: self
                .pieces
                .iter()
                .map(|p| (p.id, p.kind, p.color, p.tile, p.active, p.lives, p.strength))
                .collect(),
            occupancy: self
                .tiles()
                .filter_map(|t| t.occupant.map(|id| (t.coord, id)))
                .collect(),
        }
    }
}
