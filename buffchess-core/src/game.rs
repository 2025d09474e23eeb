//! Game context: board, history, turn and the move pipeline
//!
//! [`Game`] is the single owner of all mutable game state. Every operation
//! that changes the position goes through it, and everything a move does is
//! journalled so it can be undone exactly by players and by the search.

use std::path::Path;

use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Clock, Coord};
use crate::buffs::{
    en_passant_target, Buff, BuffEffect, ChessObject, MoveEffect, MoveQuery, UpdateEffect,
    UpdateOutcome,
};
use crate::config::{GameConfig, PromotionConfig, SetupMode};
use crate::error::GameError;
use crate::events::{GameEvent, PromotionRequest};
use crate::history::{MoveHistory, MoveOutcome, MoveRecord};
use crate::pieces::{Color, Piece, PieceId, PieceKind};
use crate::rounds::EnemyRound;
use crate::rules::{self, push_unique, MoveRule};
use crate::state::GameState;

/// Back rank of a traditional army, from the a-file
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

// ============================================================================
// CORE TYPES
// ============================================================================

/// A candidate move
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Move {
    pub piece: PieceId,
    pub from: Coord,
    pub to: Coord,
}

/// How a promotion is resolved when a piece reaches its last rank
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromotionPolicy {
    /// Suspend until [`Game::on_promotion_selected`] is called
    Ask,
    /// Promote straight away to the given type
    Auto(PieceKind),
}

/// Per-move switches distinguishing player moves from search probes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOptions {
    pub flip_turn: bool,
    pub announce: bool,
    pub promotion: PromotionPolicy,
}

impl MoveOptions {
    /// Interactive move: asks for promotion choices
    pub fn player() -> Self {
        Self {
            flip_turn: true,
            announce: true,
            promotion: PromotionPolicy::Ask,
        }
    }

    /// Move committed by the AI
    pub fn ai() -> Self {
        Self {
            promotion: PromotionPolicy::Auto(PieceKind::Queen),
            ..Self::player()
        }
    }

    /// Silent search probe that leaves the visible turn alone
    pub fn probe() -> Self {
        Self {
            flip_turn: false,
            announce: false,
            promotion: PromotionPolicy::Auto(PieceKind::Queen),
        }
    }
}

// ============================================================================
// LAYOUT DATA
// ============================================================================

/// Description of a piece to spawn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceSpec {
    pub kind: PieceKind,
    pub color: Color,
    #[serde(default)]
    pub lives: Option<i32>,
    #[serde(default)]
    pub strength: Option<i32>,
    /// Replaces the standard rules for the type
    #[serde(default)]
    pub rules: Option<Vec<MoveRule>>,
    /// Added on top of the type's default buffs
    #[serde(default)]
    pub buffs: Vec<Buff>,
}

impl PieceSpec {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self {
            kind,
            color,
            lives: None,
            strength: None,
            rules: None,
            buffs: Vec::new(),
        }
    }
}

/// Per-tile seed data for [`Game::generate_board`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileSpec {
    pub coord: Coord,
    #[serde(default)]
    pub buffs: Vec<Buff>,
    #[serde(default)]
    pub piece: Option<PieceSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub tiles: Vec<TileSpec>,
}

impl BoardLayout {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading layout {}", path.display()))?;
        let layout = serde_json::from_str(&content)
            .with_context(|| format!("parsing layout {}", path.display()))?;
        Ok(layout)
    }
}

// ============================================================================
// GAME
// ============================================================================

pub struct Game {
    board: Board,
    history: MoveHistory,
    white_to_move: bool,
    pending_promotion: Option<PromotionRequest>,
    promotion: PromotionConfig,
    events: Vec<GameEvent>,
}

impl Game {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Empty board of the given size
    pub fn new(width: i32, height: i32) -> Result<Self, GameError> {
        let mut game = Self {
            board: Board::new(width, height)?,
            history: MoveHistory::default(),
            white_to_move: true,
            pending_promotion: None,
            promotion: PromotionConfig::default(),
            events: Vec::new(),
        };
        game.announce_tiles();
        Ok(game)
    }

    /// 8x8 board with both traditional armies
    pub fn standard() -> Result<Self, GameError> {
        let mut game = Self::new(8, 8)?;
        game.setup_traditional_pieces()?;
        Ok(game)
    }

    pub fn from_config(config: &GameConfig) -> Result<Self, GameError> {
        let mut game = Self::new(config.width, config.height)?;
        game.promotion = config.promotion.clone();
        match &config.setup {
            SetupMode::Traditional => game.setup_traditional_pieces()?,
            SetupMode::Round(name) => {
                let round = EnemyRound::find(name)
                    .ok_or_else(|| GameError::UnknownRound(name.clone()))?;
                game.setup_traditional_side(Color::White)?;
                game.load_enemy_round(&round, Color::Black)?;
            }
            SetupMode::Level(level) => {
                let mut rng = ChaCha8Rng::seed_from_u64(u64::from(*level));
                let round = EnemyRound::for_level(*level, &mut rng);
                game.setup_traditional_side(Color::White)?;
                game.load_enemy_round(&round, Color::Black)?;
            }
            SetupMode::Empty => {}
        }
        Ok(game)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.board.piece(id)
    }

    pub fn clock(&self) -> Clock {
        self.board.clock()
    }

    pub fn side_to_move(&self) -> Color {
        if self.white_to_move {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn set_side_to_move(&mut self, color: Color) {
        self.white_to_move = color.is_white();
    }

    pub fn pending_promotion(&self) -> Option<&PromotionRequest> {
        self.pending_promotion.as_ref()
    }

    pub fn promotion_config(&self) -> &PromotionConfig {
        &self.promotion
    }

    /// Take every event published since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // BOARD SETUP
    // ========================================================================

    /// Rebuild the grid, optionally seeding tile buffs and starting pieces
    ///
    /// On invalid dimensions the current board is kept.
    pub fn generate_board(
        &mut self,
        width: i32,
        height: i32,
        layout: Option<&BoardLayout>,
    ) -> Result<(), GameError> {
        let board = match Board::new(width, height) {
            Ok(board) => board,
            Err(e) => {
                tracing::warn!(%e, "board generation aborted");
                return Err(e);
            }
        };
        self.board = board;
        self.history.clear();
        self.pending_promotion = None;
        self.white_to_move = true;
        self.announce_tiles();

        let Some(layout) = layout else {
            return Ok(());
        };
        for spec in &layout.tiles {
            if !self.board.contains(spec.coord) {
                tracing::warn!(coord = %spec.coord, "layout tile outside the board, skipped");
                continue;
            }
            for buff in &spec.buffs {
                self.board.push_tile_buff(spec.coord, buff.clone());
            }
            if let Some(piece) = &spec.piece {
                if let Err(e) = self.spawn_spec(piece, spec.coord) {
                    tracing::warn!(%e, "layout piece skipped");
                }
            }
        }
        Ok(())
    }

    fn announce_tiles(&mut self) {
        let created: Vec<GameEvent> = self
            .board
            .tiles()
            .map(|t| GameEvent::TileCreated {
                coord: t.coord,
                white: t.white,
            })
            .collect();
        self.events.extend(created);
    }

    /// Fresh 8x8 board with both armies in their usual places
    pub fn setup_traditional_pieces(&mut self) -> Result<(), GameError> {
        self.require_standard_board()?;
        self.generate_board(8, 8, None)?;
        self.setup_traditional_side(Color::White)?;
        self.setup_traditional_side(Color::Black)?;
        Ok(())
    }

    /// Place one traditional army on its first two ranks
    pub fn setup_traditional_side(&mut self, color: Color) -> Result<Vec<PieceId>, GameError> {
        self.require_standard_board()?;
        let (back, pawns) = match color {
            Color::White => (0, 1),
            Color::Black => (7, 6),
        };
        let mut spawned = Vec::with_capacity(16);
        for (x, kind) in BACK_RANK.iter().enumerate() {
            spawned.push(self.spawn_piece(*kind, color, Coord::new(x as i32, back), None)?);
        }
        for x in 0..8 {
            spawned.push(self.spawn_piece(PieceKind::Pawn, color, Coord::new(x, pawns), None)?);
        }
        Ok(spawned)
    }

    fn require_standard_board(&self) -> Result<(), GameError> {
        let (width, height) = (self.board.width(), self.board.height());
        if width != 8 || height != 8 {
            let e = GameError::NonStandardBoard { width, height };
            tracing::warn!(%e, "traditional setup refused");
            return Err(e);
        }
        Ok(())
    }

    // ========================================================================
    // SPAWNING
    // ========================================================================

    /// Create a piece with its type's defaults and place it
    pub fn spawn_piece(
        &mut self,
        kind: PieceKind,
        color: Color,
        coord: Coord,
        custom_rules: Option<Vec<MoveRule>>,
    ) -> Result<PieceId, GameError> {
        let spec = PieceSpec {
            rules: custom_rules,
            ..PieceSpec::new(kind, color)
        };
        self.spawn_spec(&spec, coord)
    }

    pub fn spawn_spec(&mut self, spec: &PieceSpec, coord: Coord) -> Result<PieceId, GameError> {
        let piece = self.build_piece(spec);
        self.edit_between_moves(|game| game.spawn(piece, coord, true))
    }

    fn build_piece(&self, spec: &PieceSpec) -> Piece {
        let rules = match &spec.rules {
            Some(rules) if !rules.is_empty() => rules.clone(),
            _ => rules::standard_rules(spec.kind, spec.color),
        };
        let mut buffs = if spec.kind == PieceKind::Pawn {
            Buff::pawn_defaults(spec.color, self.board.height())
        } else {
            Vec::new()
        };
        buffs.extend(spec.buffs.iter().cloned());
        let base = Piece::new(spec.kind, spec.color, rules).with_buffs(buffs);
        let (lives, strength) = (
            spec.lives.unwrap_or(base.lives),
            spec.strength.unwrap_or(base.strength),
        );
        base.with_stats(lives, strength)
    }

    fn spawn(&mut self, piece: Piece, coord: Coord, announce: bool) -> Result<PieceId, GameError> {
        let tile = self.board.tile(coord).ok_or(GameError::NoSuchTile(coord))?;
        if tile.occupant().is_some() {
            return Err(GameError::TileOccupied(coord));
        }
        let (kind, color) = (piece.kind, piece.color);
        let id = self.board.push_piece(piece);
        self.board.place(id, coord)?;
        if announce {
            self.emit(GameEvent::PieceCreated {
                piece: id,
                kind,
                color,
                coord,
            });
        }
        Ok(id)
    }

    /// Bring a downed piece back where it fell with `lives` lives
    ///
    /// `lives` must be at least one.
    pub fn revive_piece(&mut self, id: PieceId, lives: i32) -> Result<Coord, GameError> {
        let coord = self.edit_between_moves(|game| game.board.revive(id, lives))?;
        self.emit(GameEvent::PieceRevived { piece: id, coord });
        Ok(coord)
    }

    pub fn add_piece_buff(&mut self, id: PieceId, buff: Buff) -> Result<(), GameError> {
        if self.board.piece(id).is_none() {
            return Err(GameError::NoSuchPiece(id));
        }
        self.edit_between_moves(|game| {
            game.board.push_piece_buff(id, buff);
            Ok(())
        })
    }

    pub fn add_tile_buff(&mut self, coord: Coord, buff: Buff) -> Result<(), GameError> {
        if !self.board.contains(coord) {
            return Err(GameError::NoSuchTile(coord));
        }
        self.edit_between_moves(|game| {
            game.board.push_tile_buff(coord, buff);
            Ok(())
        })
    }

    /// Run an edit made between moves
    ///
    /// Its changes join the newest history entry, so undoing that move
    /// reverts the edit as well and the journal stays strictly last in,
    /// first out.
    fn edit_between_moves<T>(
        &mut self,
        edit: impl FnOnce(&mut Self) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        if self.history.is_empty() {
            return edit(self);
        }
        self.board.begin_journal();
        let result = edit(self);
        let changes = self.board.end_journal();
        match result {
            Ok(value) => {
                if let Some(record) = self.history.last_mut() {
                    record.changes.extend(changes);
                }
                Ok(value)
            }
            Err(e) => {
                self.board.revert_all(changes);
                Err(e)
            }
        }
    }

    // ========================================================================
    // MOVE GENERATION
    // ========================================================================

    /// Legal destinations for a piece: its rules plus every active move buff
    /// on the piece and on the tile it stands on
    pub fn valid_tiles(&self, id: PieceId) -> Vec<Coord> {
        let Some(piece) = self.board.piece(id).filter(|p| p.active) else {
            return Vec::new();
        };
        let Some(origin) = piece.tile else {
            return Vec::new();
        };
        let mut tiles = rules::valid_tiles(&piece.rules, origin, &self.board, piece.color);
        let query = MoveQuery {
            board: &self.board,
            history: &self.history,
            origin,
            color: piece.color,
            rules: &piece.rules,
        };
        let tile_buffs = self.board.tile(origin).map(|t| t.buffs()).unwrap_or(&[]);
        for buff in piece.buffs.iter().chain(tile_buffs) {
            for coord in buff.move_tiles(&query) {
                push_unique(&mut tiles, coord);
            }
        }
        tiles
    }

    /// Every move available to `color`, pieces in spawn order
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for piece in self.board.pieces_of(color) {
            let Some(from) = piece.tile else { continue };
            for to in self.valid_tiles(piece.id) {
                moves.push(Move {
                    piece: piece.id,
                    from,
                    to,
                });
            }
        }
        moves
    }

    // ========================================================================
    // MOVE EXECUTION
    // ========================================================================

    /// Commit a player move
    pub fn move_piece(&mut self, id: PieceId, to: Coord) -> Result<MoveOutcome, GameError> {
        self.make_move(id, to, MoveOptions::player())
    }

    /// Validate and commit a move with explicit options
    pub fn make_move(
        &mut self,
        id: PieceId,
        to: Coord,
        options: MoveOptions,
    ) -> Result<MoveOutcome, GameError> {
        if let Err(e) = self.validate_move(id, to) {
            tracing::warn!(%e, "move rejected");
            return Err(e);
        }
        Ok(self.execute(id, to, options))
    }

    fn validate_move(&self, id: PieceId, to: Coord) -> Result<(), GameError> {
        if self.pending_promotion.is_some() {
            return Err(GameError::PromotionPending);
        }
        let piece = self.board.piece(id).ok_or(GameError::NoSuchPiece(id))?;
        if !piece.active {
            return Err(GameError::PieceInactive(id));
        }
        if !self.board.contains(to) {
            return Err(GameError::NoSuchTile(to));
        }
        if !self.valid_tiles(id).contains(&to) {
            return Err(GameError::IllegalDestination { piece: id, to });
        }
        Ok(())
    }

    /// Apply a generated move without validation or side effects outside
    /// the board; pair with [`Game::undo_probe`]
    pub fn probe_move(&mut self, mv: Move) -> MoveOutcome {
        self.execute(mv.piece, mv.to, MoveOptions::probe())
    }

    fn execute(&mut self, id: PieceId, to: Coord, options: MoveOptions) -> MoveOutcome {
        let Some((kind, color, from, label)) = self
            .board
            .piece(id)
            .and_then(|p| p.tile.map(|from| (p.kind, p.color, from, p.label())))
        else {
            return MoveOutcome::Repelled { defender: id };
        };
        let takes_en_passant = self.takes_en_passant(id, from, color, to);
        let was_white_turn = self.white_to_move;

        self.board.begin_journal();
        let defender = self.board.piece_at(to).map(|p| p.id);
        let mut captured = Vec::new();
        let outcome = if self.board.fight(defender, id) {
            captured.extend(defender);
            self.board.relocate(id, to);
            self.board.set_has_moved(id, true);
            if takes_en_passant {
                self.board.push_tile_buff(to, Buff::en_passant_capture());
            }
            self.run_update_buffs(id, to, options, &mut captured)
        } else {
            MoveOutcome::Repelled {
                defender: defender.unwrap_or(id),
            }
        };
        if color == Color::Black {
            self.advance_turn(options.announce);
        }
        let changes = self.board.end_journal();

        self.history.push(MoveRecord {
            piece: id,
            kind,
            color,
            from,
            to,
            captured: captured.clone(),
            was_white_turn,
            outcome,
            flipped_turn: options.flip_turn,
            changes,
        });
        if options.flip_turn {
            self.white_to_move = !was_white_turn;
        }

        if options.announce {
            tracing::debug!(piece = %id, %from, %to, ?outcome, "move committed");
            self.announce_move(id, &label, from, to, outcome, captured);
        }
        outcome
    }

    fn takes_en_passant(&self, id: PieceId, from: Coord, color: Color, to: Coord) -> bool {
        let has_buff = self.board.piece(id).is_some_and(|p| {
            p.active_buffs()
                .any(|b| b.effect == BuffEffect::Move(MoveEffect::EnPassant))
        });
        has_buff
            && en_passant_target(&self.board, &self.history, from, color)
                .is_some_and(|(target, _)| target == to)
    }

    /// Tile buffs on the destination, then the mover's own buffs
    fn run_update_buffs(
        &mut self,
        id: PieceId,
        to: Coord,
        options: MoveOptions,
        captured: &mut Vec<PieceId>,
    ) -> MoveOutcome {
        let tile_buffs = self.board.tile(to).map_or(0, |t| t.buffs().len());
        for index in 0..tile_buffs {
            let Some(mut buff) = self.board.tile(to).and_then(|t| t.buffs().get(index)).cloned()
            else {
                break;
            };
            if !buff.active || !buff.is_update() {
                continue;
            }
            let before = buff.clone();
            let outcome = match buff.apply_update(ChessObject::Tile(to), &mut self.board) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(%e, coord = %to, "tile buff skipped");
                    continue;
                }
            };
            if let Some(UpdateOutcome::Reverse { attacker }) = outcome {
                self.board.rollback_to(0);
                captured.clear();
                let strength = self.board.piece(attacker).map_or(0, |p| p.strength);
                if self.board.damage(attacker, strength) {
                    captured.push(attacker);
                }
                self.board.set_tile_buff(to, index, buff);
                tracing::debug!(piece = %attacker, coord = %to, "move reversed by guard");
                return MoveOutcome::Reversed;
            }
            if let Some(UpdateOutcome::Captured(ids)) = &outcome {
                captured.extend(ids.iter().copied());
            }
            if buff != before {
                self.board.set_tile_buff(to, index, buff);
            }
        }

        let piece_buffs = self.board.piece(id).map_or(0, |p| p.buffs.len());
        for index in 0..piece_buffs {
            if !self.board.piece(id).is_some_and(|p| p.active) {
                break;
            }
            let Some(mut buff) = self.board.piece(id).and_then(|p| p.buffs.get(index)).cloned()
            else {
                break;
            };
            if !buff.active || !buff.is_update() {
                continue;
            }
            let before = buff.clone();
            let outcome = match buff.apply_update(ChessObject::Piece(id), &mut self.board) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(%e, piece = %id, "piece buff skipped");
                    continue;
                }
            };
            if buff != before {
                self.board.set_piece_buff(id, index, buff);
            }
            match outcome {
                Some(UpdateOutcome::Captured(ids)) => captured.extend(ids),
                Some(UpdateOutcome::PromotionDue) => {
                    self.begin_promotion(id, to, options);
                    break;
                }
                _ => {}
            }
        }
        MoveOutcome::Moved
    }

    /// Bump the turn counter, reconcile every buff against it, drop spent
    /// tile buffs and let downed zombies rise
    fn advance_turn(&mut self, announce: bool) {
        let mut clock = self.board.clock();
        clock.turn += 1;
        self.board.set_clock(clock);
        self.reconcile_buffs();
        self.board.prune_tile_buffs();
        for (piece, coord) in self.raise_zombies() {
            tracing::debug!(%piece, %coord, "zombie rose");
            if announce {
                self.emit(GameEvent::PieceRevived { piece, coord });
            }
        }
    }

    fn raise_zombies(&mut self) -> Vec<(PieceId, Coord)> {
        let mut downed: Vec<PieceId> = self.board.downed().map(|(id, _)| id).collect();
        downed.sort();
        let mut risen = Vec::new();
        for id in downed {
            let buffs = self.board.piece(id).map_or(0, |p| p.buffs.len());
            for index in 0..buffs {
                let Some(mut buff) = self.board.piece(id).and_then(|p| p.buffs.get(index)).cloned()
                else {
                    break;
                };
                let is_zombie =
                    matches!(buff.effect, BuffEffect::Update(UpdateEffect::Zombie { .. }));
                if !buff.active || !is_zombie {
                    continue;
                }
                match buff.apply_update(ChessObject::Piece(id), &mut self.board) {
                    Ok(Some(UpdateOutcome::Revived(_))) => {
                        self.board.set_piece_buff(id, index, buff);
                        if let Some(at) = self.board.piece(id).and_then(|p| p.tile) {
                            risen.push((id, at));
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(%e, piece = %id, "zombie buff skipped"),
                }
            }
        }
        risen
    }

    fn reconcile_buffs(&mut self) {
        let clock = self.board.clock();
        let piece_updates: Vec<(PieceId, usize, Buff)> = self
            .board
            .all_pieces()
            .iter()
            .flat_map(|p| {
                p.buffs.iter().enumerate().filter_map(move |(i, b)| {
                    let mut next = b.clone();
                    next.update_duration(clock);
                    (next != *b).then_some((p.id, i, next))
                })
            })
            .collect();
        for (id, index, mut buff) in piece_updates {
            if !buff.active {
                buff.on_expire(id, &mut self.board);
            }
            self.board.set_piece_buff(id, index, buff);
        }

        let tile_updates: Vec<(Coord, usize, Buff)> = self
            .board
            .tiles()
            .flat_map(|t| {
                t.buffs().iter().enumerate().filter_map(move |(i, b)| {
                    let mut next = b.clone();
                    next.update_duration(clock);
                    (next != *b).then_some((t.coord, i, next))
                })
            })
            .collect();
        for (coord, index, buff) in tile_updates {
            self.board.set_tile_buff(coord, index, buff);
        }
    }

    /// Start a new round of the run
    ///
    /// Clears the undo history, expires round-limited buffs and drops
    /// inactive tile buffs. A pending skip jumps over one extra round.
    pub fn next_round(&mut self) {
        let mut clock = self.board.clock();
        if clock.skip_round {
            clock.round += 2;
            clock.skip_round = false;
            tracing::info!(skipped = clock.round - 1, "round skipped");
        } else {
            clock.round += 1;
        }
        self.board.set_clock(clock);
        self.reconcile_buffs();
        self.board.prune_tile_buffs();
        self.history.clear();
        self.pending_promotion = None;
        tracing::info!(round = clock.round, "round started");
    }

    fn announce_move(
        &mut self,
        id: PieceId,
        label: &str,
        from: Coord,
        to: Coord,
        outcome: MoveOutcome,
        captured: Vec<PieceId>,
    ) {
        let line = match outcome {
            MoveOutcome::Moved if captured.is_empty() => format!("{label} {from} -> {to}"),
            MoveOutcome::Moved => format!("{label} {from} x {to}"),
            MoveOutcome::Repelled { defender } => {
                let left = self.board.piece(defender).map_or(0, |p| p.lives);
                format!("{label} {from} hits {to} ({left} lives left)")
            }
            MoveOutcome::Reversed => format!("{label} {from} -> {to} reversed!"),
        };
        self.emit(GameEvent::Notification(line));
        for &piece in &captured {
            let fell_at = self.board.downed().find(|(p, _)| *p == piece).map(|(_, c)| c);
            if let Some(coord) = fell_at {
                self.emit(GameEvent::PieceDestroyed { piece, coord });
            }
        }
        self.emit(GameEvent::MoveCompleted {
            piece: id,
            from,
            to,
            outcome,
            captured,
        });
        self.announce_state();
    }

    /// Publish check highlights and a game-over event if the side to move
    /// is out of moves
    fn announce_state(&mut self) {
        if self.pending_promotion.is_some() {
            return;
        }
        let kings: Vec<(PieceId, bool)> = [Color::White, Color::Black]
            .into_iter()
            .flat_map(|c| self.board.kings(c).map(|k| k.id).collect::<Vec<_>>())
            .map(|k| (k, self.king_in_check(k)))
            .collect();
        for (king, in_check) in kings {
            self.emit(GameEvent::Check { king, in_check });
        }
        let state = self.check_game_state(self.side_to_move());
        if state != GameState::Ongoing {
            tracing::info!(?state, "game over");
            self.emit(GameEvent::GameEnded(state));
        }
    }

    // ========================================================================
    // PROMOTION
    // ========================================================================

    fn begin_promotion(&mut self, id: PieceId, at: Coord, options: MoveOptions) {
        match options.promotion {
            PromotionPolicy::Auto(kind) => {
                if let Err(e) = self.splice_promotion(id, kind, options.announce) {
                    tracing::warn!(%e, piece = %id, "automatic promotion failed");
                }
            }
            PromotionPolicy::Ask => {
                let Some(color) = self.board.piece(id).map(|p| p.color) else {
                    return;
                };
                let request = PromotionRequest {
                    piece: id,
                    coord: at,
                    color,
                    candidates: self.promotion.candidates.clone(),
                    tooltips: self.promotion.tooltips.clone(),
                    title: self.promotion.title.clone(),
                    confirm: self.promotion.confirm.clone(),
                };
                tracing::debug!(piece = %id, coord = %at, "promotion requested");
                self.emit(GameEvent::PromotionRequested(request.clone()));
                self.pending_promotion = Some(request);
            }
        }
    }

    /// Swap `old` for a fresh piece of `kind` on the same tile
    fn splice_promotion(
        &mut self,
        old: PieceId,
        kind: PieceKind,
        announce: bool,
    ) -> Result<PieceId, GameError> {
        let piece = self.board.piece(old).ok_or(GameError::NoSuchPiece(old))?;
        let at = piece.tile.ok_or(GameError::PieceInactive(old))?;
        let spec = PieceSpec {
            lives: Some(piece.lives),
            strength: Some(piece.strength),
            ..PieceSpec::new(kind, piece.color)
        };
        let replacement = self.build_piece(&spec);
        self.board.retire(old);
        self.spawn(replacement, at, announce)
    }

    /// Complete a pending promotion with the chosen piece type
    pub fn on_promotion_selected(&mut self, kind: PieceKind) -> Result<PieceId, GameError> {
        let request = self
            .pending_promotion
            .as_ref()
            .ok_or(GameError::NoPendingPromotion)?;
        if !request.candidates.contains(&kind) {
            return Err(GameError::NotACandidate(kind));
        }
        let (old, at) = (request.piece, request.coord);
        let label = self.board.piece(old).map(|p| p.label()).unwrap_or_default();

        let new = self.edit_between_moves(|game| game.splice_promotion(old, kind, true))?;
        self.pending_promotion = None;
        self.emit(GameEvent::Notification(format!(
            "{label} promoted to {} on {at}",
            kind.name()
        )));
        self.announce_state();
        Ok(new)
    }

    // ========================================================================
    // UNDO
    // ========================================================================

    /// Revert the most recent move, restoring the side to move
    pub fn undo_last_move(&mut self) -> bool {
        let Some(label) = self.history.last().map(|r| format!("{} -> {}", r.to, r.from)) else {
            tracing::debug!("undo requested with empty history");
            return false;
        };
        let undone = self.undo();
        if undone {
            self.emit(GameEvent::Notification(format!("Undo {label}")));
        }
        undone
    }

    /// Undo up to `n` moves, returning how many were undone
    pub fn undo_moves(&mut self, n: usize) -> usize {
        let count = n.min(self.history.len());
        (0..count).take_while(|_| self.undo_last_move()).count()
    }

    /// Revert a search probe without touching the visible turn
    pub fn undo_probe(&mut self) -> bool {
        self.undo()
    }

    fn undo(&mut self) -> bool {
        let Some(record) = self.history.pop() else {
            return false;
        };
        let raised_promotion = self
            .pending_promotion
            .as_ref()
            .is_some_and(|r| r.piece == record.piece && r.coord == record.to);
        self.board.revert_all(record.changes);
        if record.flipped_turn {
            self.white_to_move = record.was_white_turn;
        }
        if raised_promotion {
            self.pending_promotion = None;
        }
        true
    }
}
