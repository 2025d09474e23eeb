//! Status effects ("buffs") attached to pieces and tiles
//!
//! A buff is either a *move* effect, which only contributes extra candidate
//! destinations and never mutates anything, or an *update* effect, which runs
//! after a move has been committed and may change state reachable from the
//! board. Every effect is a variant of a closed enum so dispatch is a plain
//! `match`.
//!
//! Lifecycle: a buff starts active and becomes inactive for good when a
//! limited duration reaches zero or when a one-time buff has fired. Inactive
//! buffs stay in their list; they are only skipped.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Clock, Coord};
use crate::error::BuffError;
use crate::history::{MoveHistory, MoveOutcome};
use crate::pieces::{Color, PieceId, PieceKind};
use crate::rules::{push_unique, standard_rules, valid_tiles, MoveRule};

/// Duration value meaning "never expires"
pub const UNLIMITED: i32 = -1;

/// Board height the en passant rank maths is defined for
const EN_PASSANT_BOARD_HEIGHT: i32 = 8;

// ============================================================================
// EFFECTS
// ============================================================================

/// Effects that add destinations during move generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveEffect {
    /// Two squares forward from the home rank
    DoubleStep,
    /// Capture a pawn that just double-stepped past
    EnPassant,
    /// Move like a queen
    Zoomies,
    /// Every rule reaches one square further
    SpeedRun,
}

/// Effects applied after a move resolves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateEffect {
    /// Ask for a replacement piece on reaching `rank`
    Promote { rank: i32 },
    /// Heal adjacent allies, paying for it with own lives
    BlessingInDisguise { heal: i32 },
    /// Double current lives
    BuiltDifferent,
    /// Permanent strength bonus
    ThrowingHands { amount: i32 },
    /// Strength bonus while no ally is adjacent
    LoneWolf { bonus: i32, granted: bool },
    /// Weaken every enemy piece
    SkillIssue { reduction: i32, floor: i32 },
    /// Leave a guard on the tile the piece stops on
    UnoReverse { guarding: Option<Coord> },
    /// Stand back up once per round after being destroyed
    Zombie { heal: i32, round_used: Option<u32> },
    /// The next round start jumps one round further
    InstallingUpdates,
    /// Each enemy piece other than the king falls with even odds
    Snap { seed: u64 },
    /// Huge temporary lives for every ally, taken back on expiry
    AiShield { bonus: i32, shielded: bool },
    /// Tile effect: fight the pawn standing behind the arriving piece
    EnPassantCapture,
    /// Tile effect: bounce an enemy of `protects` back where it came from
    UnoReverseGuard { protects: PieceId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffEffect {
    Move(MoveEffect),
    Update(UpdateEffect),
}

/// Object an update effect is applied to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChessObject {
    Piece(PieceId),
    Tile(Coord),
}

impl ChessObject {
    fn kind_name(self) -> &'static str {
        match self {
            ChessObject::Piece(_) => "piece",
            ChessObject::Tile(_) => "tile",
        }
    }
}

/// What the game has to do after an update effect fired
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Nothing,
    /// Pieces destroyed by the effect
    Captured(Vec<PieceId>),
    /// The piece reached its promotion rank
    PromotionDue,
    /// The carrier came back on the tile where it fell
    Revived(PieceId),
    /// Undo the move in progress and punish `attacker`
    Reverse { attacker: PieceId },
}

/// Read-only view handed to move effects
pub struct MoveQuery<'a> {
    pub board: &'a Board,
    pub history: &'a MoveHistory,
    pub origin: Coord,
    pub color: Color,
    pub rules: &'a [MoveRule],
}

// ============================================================================
// BUFF
// ============================================================================

/// An effect plus its bookkeeping
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub name: String,
    pub description: String,
    /// Shop price, bookkeeping only
    pub cost: i32,
    pub active: bool,
    pub duration_turns: i32,
    pub duration_rounds: i32,
    pub one_time: bool,
    pub was_used: bool,
    /// Clock reading the durations were last reconciled against
    pub last_turn: u32,
    pub last_round: u32,
    pub effect: BuffEffect,
}

impl Buff {
    pub fn new(name: &str, description: &str, effect: BuffEffect) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            cost: 0,
            active: true,
            duration_turns: UNLIMITED,
            duration_rounds: UNLIMITED,
            one_time: false,
            was_used: false,
            last_turn: 0,
            last_round: 0,
            effect,
        }
    }

    pub fn with_cost(mut self, cost: i32) -> Self {
        self.cost = cost;
        self
    }

    pub fn for_turns(mut self, turns: i32) -> Self {
        self.duration_turns = turns;
        self
    }

    pub fn for_rounds(mut self, rounds: i32) -> Self {
        self.duration_rounds = rounds;
        self
    }

    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }

    /// Stamp the clock reading the buff starts counting from
    pub fn attached_at(mut self, clock: Clock) -> Self {
        self.last_turn = clock.turn;
        self.last_round = clock.round;
        self
    }

    pub fn is_update(&self) -> bool {
        matches!(self.effect, BuffEffect::Update(_))
    }

    // ========================================================================
    // DURATION
    // ========================================================================

    /// Subtract the turns and rounds elapsed since the last reconciliation
    ///
    /// Unlimited durations are never decremented and limited ones stop at
    /// zero. Inactive buffs are left untouched.
    pub fn update_duration(&mut self, clock: Clock) {
        if !self.active {
            return;
        }
        if clock.turn > self.last_turn {
            let elapsed = (clock.turn - self.last_turn) as i32;
            if self.duration_turns != UNLIMITED {
                self.duration_turns = (self.duration_turns - elapsed).max(0);
            }
            self.last_turn = clock.turn;
        }
        if clock.round > self.last_round {
            let elapsed = (clock.round - self.last_round) as i32;
            if self.duration_rounds != UNLIMITED {
                self.duration_rounds = (self.duration_rounds - elapsed).max(0);
            }
            self.last_round = clock.round;
        }
        let spent = self.one_time && self.was_used;
        if self.duration_turns == 0 || self.duration_rounds == 0 || spent {
            self.active = false;
        }
    }

    /// Record that the buff fired
    pub fn mark_fired(&mut self) {
        self.was_used = true;
        if self.one_time {
            self.active = false;
        }
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Extra destinations from an active move effect
    pub fn move_tiles(&self, query: &MoveQuery<'_>) -> Vec<Coord> {
        match self.effect {
            BuffEffect::Move(effect) if self.active => effect.extra_tiles(query),
            _ => Vec::new(),
        }
    }

    /// Run an active update effect against `receiver`
    ///
    /// `Ok(None)` means the effect had nothing to do this time and did not
    /// fire.
    pub fn apply_update(
        &mut self,
        receiver: ChessObject,
        board: &mut Board,
    ) -> Result<Option<UpdateOutcome>, BuffError> {
        let BuffEffect::Update(mut effect) = self.effect else {
            return Ok(None);
        };
        if !self.active {
            return Ok(None);
        }
        let expected = effect.receiver();
        if expected != receiver.kind_name() {
            return Err(BuffError::InvalidArgument {
                buff: self.name.clone(),
                expected,
                got: receiver.kind_name(),
            });
        }
        let outcome = effect.apply(receiver, board);
        self.effect = BuffEffect::Update(effect);
        if outcome.is_some() {
            self.mark_fired();
        }
        Ok(outcome)
    }

    /// Undo whatever an effect holds in place once the buff has gone inactive
    pub(crate) fn on_expire(&mut self, owner: PieceId, board: &mut Board) {
        let BuffEffect::Update(UpdateEffect::AiShield { bonus, shielded: true }) = self.effect
        else {
            return;
        };
        if let Some(color) = board.piece(owner).map(|p| p.color) {
            let shielded: Vec<(PieceId, i32)> = board
                .pieces_of(color)
                .filter(|p| p.lives > bonus)
                .map(|p| (p.id, p.lives - bonus))
                .collect();
            for (id, lives) in shielded {
                board.set_lives(id, lives);
            }
        }
        self.effect = BuffEffect::Update(UpdateEffect::AiShield { bonus, shielded: false });
    }
}

// ============================================================================
// MOVE EFFECTS
// ============================================================================

impl MoveEffect {
    pub fn extra_tiles(self, q: &MoveQuery<'_>) -> Vec<Coord> {
        match self {
            MoveEffect::DoubleStep => double_step(q).into_iter().collect(),
            MoveEffect::EnPassant => en_passant_target(q.board, q.history, q.origin, q.color)
                .map(|(target, _)| target)
                .into_iter()
                .collect(),
            MoveEffect::Zoomies => valid_tiles(
                &standard_rules(PieceKind::Queen, q.color),
                q.origin,
                q.board,
                q.color,
            ),
            MoveEffect::SpeedRun => {
                let extended: Vec<MoveRule> = q.rules.iter().map(|r| r.extended(1)).collect();
                let mut out = Vec::new();
                for c in valid_tiles(&extended, q.origin, q.board, q.color) {
                    push_unique(&mut out, c);
                }
                out
            }
        }
    }
}

fn home_rank(board: &Board, color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => board.height() - 2,
    }
}

fn double_step(q: &MoveQuery<'_>) -> Option<Coord> {
    if q.origin.y != home_rank(q.board, q.color) {
        return None;
    }
    let f = q.color.forward();
    let one = q.origin.offset(0, f, 1);
    let two = q.origin.offset(0, f, 2);
    let clear = |c: Coord| q.board.contains(c) && q.board.piece_at(c).is_none();
    (clear(one) && clear(two)).then_some(two)
}

/// En passant landing square and the pawn it would take
///
/// Only defined on 8-tall boards; other heights yield nothing.
pub fn en_passant_target(
    board: &Board,
    history: &MoveHistory,
    origin: Coord,
    color: Color,
) -> Option<(Coord, PieceId)> {
    if board.height() != EN_PASSANT_BOARD_HEIGHT {
        return None;
    }
    let last = history.last()?;
    if last.kind != PieceKind::Pawn
        || last.color == color
        || last.outcome != MoveOutcome::Moved
        || (last.to.y - last.from.y).abs() != 2
    {
        return None;
    }
    let capture_rank = match color {
        Color::White => board.height() - 4,
        Color::Black => 3,
    };
    if origin.y != capture_rank || last.to.y != origin.y || (last.to.x - origin.x).abs() != 1 {
        return None;
    }
    let victim = board.piece_at(last.to)?;
    if victim.id != last.piece || victim.kind != PieceKind::Pawn || victim.color == color {
        return None;
    }
    let target = Coord::new(last.to.x, origin.y + color.forward());
    (board.contains(target) && board.piece_at(target).is_none()).then_some((target, victim.id))
}

// ============================================================================
// UPDATE EFFECTS
// ============================================================================

impl UpdateEffect {
    /// Kind of object this effect must be applied to
    pub fn receiver(self) -> &'static str {
        match self {
            UpdateEffect::EnPassantCapture | UpdateEffect::UnoReverseGuard { .. } => "tile",
            _ => "piece",
        }
    }

    fn apply(&mut self, receiver: ChessObject, board: &mut Board) -> Option<UpdateOutcome> {
        match (*self, receiver) {
            (UpdateEffect::Promote { rank }, ChessObject::Piece(id)) => {
                let at = board.piece(id)?.tile?;
                (at.y == rank).then_some(UpdateOutcome::PromotionDue)
            }
            (UpdateEffect::BlessingInDisguise { heal }, ChessObject::Piece(id)) => {
                let allies = adjacent_allies(board, id);
                let mut healed = 0;
                for ally in allies {
                    if let Some(lives) = board.piece(ally).map(|p| p.lives) {
                        board.set_lives(ally, lives + heal);
                        healed += heal;
                    }
                }
                if healed > 0 && board.damage(id, healed) {
                    return Some(UpdateOutcome::Captured(vec![id]));
                }
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::BuiltDifferent, ChessObject::Piece(id)) => {
                let lives = board.piece(id)?.lives;
                board.set_lives(id, lives * 2);
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::ThrowingHands { amount }, ChessObject::Piece(id)) => {
                let strength = board.piece(id)?.strength;
                board.set_strength(id, strength + amount);
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::LoneWolf { bonus, granted }, ChessObject::Piece(id)) => {
                let strength = board.piece(id)?.strength;
                let alone = adjacent_allies(board, id).is_empty();
                if alone && !granted {
                    board.set_strength(id, strength + bonus);
                    *self = UpdateEffect::LoneWolf { bonus, granted: true };
                    Some(UpdateOutcome::Nothing)
                } else if !alone && granted {
                    board.set_strength(id, (strength - bonus).max(1));
                    *self = UpdateEffect::LoneWolf { bonus, granted: false };
                    Some(UpdateOutcome::Nothing)
                } else {
                    None
                }
            }
            (UpdateEffect::SkillIssue { reduction, floor }, ChessObject::Piece(id)) => {
                let enemy = board.piece(id)?.color.opponent();
                let weakened: Vec<(PieceId, i32)> = board
                    .pieces_of(enemy)
                    .map(|p| (p.id, (p.strength - reduction).max(floor)))
                    .collect();
                for (target, strength) in weakened {
                    board.set_strength(target, strength);
                }
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::UnoReverse { guarding }, ChessObject::Piece(id)) => {
                let at = board.piece(id)?.tile?;
                if guarding == Some(at) {
                    return None;
                }
                if let Some(old) = guarding {
                    retire_guard(board, old, id);
                }
                board.push_tile_buff(at, Buff::uno_reverse_guard(id));
                *self = UpdateEffect::UnoReverse { guarding: Some(at) };
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::Zombie { heal, round_used }, ChessObject::Piece(id)) => {
                let round = board.clock().round;
                if round_used == Some(round) || !board.is_downed(id) {
                    return None;
                }
                board.revive(id, heal).ok()?;
                *self = UpdateEffect::Zombie { heal, round_used: Some(round) };
                Some(UpdateOutcome::Revived(id))
            }
            (UpdateEffect::InstallingUpdates, ChessObject::Piece(_)) => {
                let mut clock = board.clock();
                if clock.skip_round {
                    return None;
                }
                clock.skip_round = true;
                board.set_clock(clock);
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::Snap { seed }, ChessObject::Piece(id)) => {
                let enemy = board.piece(id)?.color.opponent();
                let mut rng = ChaCha8Rng::seed_from_u64(seed ^ board.position_hash());
                let candidates: Vec<(PieceId, i32)> = board
                    .pieces_of(enemy)
                    .filter(|p| p.kind != PieceKind::King)
                    .map(|p| (p.id, p.lives))
                    .collect();
                let mut fallen = Vec::new();
                for (target, lives) in candidates {
                    if rng.gen_bool(0.5) && board.damage(target, lives) {
                        fallen.push(target);
                    }
                }
                Some(UpdateOutcome::Captured(fallen))
            }
            (UpdateEffect::AiShield { bonus, shielded }, ChessObject::Piece(id)) => {
                if shielded {
                    return None;
                }
                let color = board.piece(id)?.color;
                let allies: Vec<(PieceId, i32)> =
                    board.pieces_of(color).map(|p| (p.id, p.lives + bonus)).collect();
                for (ally, lives) in allies {
                    board.set_lives(ally, lives);
                }
                *self = UpdateEffect::AiShield { bonus, shielded: true };
                Some(UpdateOutcome::Nothing)
            }
            (UpdateEffect::EnPassantCapture, ChessObject::Tile(at)) => {
                let arriving = board.piece_at(at)?;
                let (attacker, color) = (arriving.id, arriving.color);
                let behind = at.offset(0, -color.forward(), 1);
                let victim = board
                    .piece_at(behind)
                    .filter(|p| p.kind == PieceKind::Pawn && p.color != color)?
                    .id;
                if board.fight(Some(victim), attacker) {
                    Some(UpdateOutcome::Captured(vec![victim]))
                } else {
                    Some(UpdateOutcome::Nothing)
                }
            }
            (UpdateEffect::UnoReverseGuard { protects }, ChessObject::Tile(at)) => {
                let guarded_color = board.piece(protects)?.color;
                let arriving = board.piece_at(at)?;
                (arriving.color != guarded_color)
                    .then_some(UpdateOutcome::Reverse { attacker: arriving.id })
            }
            _ => None,
        }
    }
}

fn adjacent_allies(board: &Board, id: PieceId) -> Vec<PieceId> {
    let Some(piece) = board.piece(id) else {
        return Vec::new();
    };
    let Some(at) = piece.tile else {
        return Vec::new();
    };
    at.neighbors()
        .filter_map(|c| board.piece_at(c))
        .filter(|p| p.color == piece.color)
        .map(|p| p.id)
        .collect()
}

/// Deactivate the guard `owner` left on `at`
fn retire_guard(board: &mut Board, at: Coord, owner: PieceId) {
    let Some(tile) = board.tile(at) else {
        return;
    };
    let stale: Vec<(usize, Buff)> = tile
        .buffs()
        .iter()
        .enumerate()
        .filter(|(_, b)| {
            b.active
                && b.effect == BuffEffect::Update(UpdateEffect::UnoReverseGuard { protects: owner })
        })
        .map(|(i, b)| {
            let mut b = b.clone();
            b.active = false;
            (i, b)
        })
        .collect();
    for (index, buff) in stale {
        board.set_tile_buff(at, index, buff);
    }
}

// ============================================================================
// CATALOGUE
// ============================================================================

impl Buff {
    pub fn double_step() -> Self {
        Buff::new(
            "Extra Reach",
            "Advance two squares from the home rank.",
            BuffEffect::Move(MoveEffect::DoubleStep),
        )
    }

    pub fn en_passant() -> Self {
        Buff::new(
            "En Passant",
            "Capture a pawn that just rushed past.",
            BuffEffect::Move(MoveEffect::EnPassant),
        )
    }

    pub fn zoomies() -> Self {
        Buff::new(
            "Zoomies",
            "Moves like a queen for the rest of the round.",
            BuffEffect::Move(MoveEffect::Zoomies),
        )
        .with_cost(6)
        .for_rounds(1)
    }

    pub fn speed_run() -> Self {
        Buff::new(
            "Speed Run",
            "Every move reaches one square further.",
            BuffEffect::Move(MoveEffect::SpeedRun),
        )
        .with_cost(5)
    }

    pub fn promote(rank: i32) -> Self {
        Buff::new(
            "Royal Ascension",
            "Promote on reaching the far rank.",
            BuffEffect::Update(UpdateEffect::Promote { rank }),
        )
    }

    pub fn blessing_in_disguise() -> Self {
        Buff::new(
            "Blessing in Disguise",
            "Heal adjacent allies by one life each, losing as many lives.",
            BuffEffect::Update(UpdateEffect::BlessingInDisguise { heal: 1 }),
        )
        .with_cost(3)
    }

    pub fn built_different() -> Self {
        Buff::new(
            "Built Different",
            "Double this piece's lives.",
            BuffEffect::Update(UpdateEffect::BuiltDifferent),
        )
        .with_cost(4)
        .once()
    }

    pub fn throwing_hands() -> Self {
        Buff::new(
            "Throwing Hands",
            "Gain one strength.",
            BuffEffect::Update(UpdateEffect::ThrowingHands { amount: 1 }),
        )
        .with_cost(3)
        .once()
    }

    pub fn lone_wolf() -> Self {
        Buff::new(
            "Lone Wolf",
            "Two extra strength while no ally stands next to this piece.",
            BuffEffect::Update(UpdateEffect::LoneWolf { bonus: 2, granted: false }),
        )
        .with_cost(4)
    }

    pub fn skill_issue() -> Self {
        Buff::new(
            "Skill Issue",
            "Every enemy piece loses one strength, down to one.",
            BuffEffect::Update(UpdateEffect::SkillIssue { reduction: 1, floor: 1 }),
        )
        .with_cost(5)
        .once()
    }

    pub fn uno_reverse() -> Self {
        Buff::new(
            "Uno Reverse",
            "An enemy capturing this piece is sent back and hurt by its own strength.",
            BuffEffect::Update(UpdateEffect::UnoReverse { guarding: None }),
        )
        .with_cost(6)
        .for_rounds(1)
    }

    pub fn zombie() -> Self {
        Buff::new(
            "Zombie",
            "Once per round, rise again with one life where this piece fell.",
            BuffEffect::Update(UpdateEffect::Zombie { heal: 1, round_used: None }),
        )
        .with_cost(5)
    }

    pub fn installing_updates() -> Self {
        Buff::new(
            "Installing Updates",
            "Skip the next round.",
            BuffEffect::Update(UpdateEffect::InstallingUpdates),
        )
        .with_cost(3)
        .once()
    }

    /// `seed` mixes with the position, so the same board always snaps alike
    pub fn snap(seed: u64) -> Self {
        Buff::new(
            "Snap",
            "Half of the enemy army, king excepted, turns to dust.",
            BuffEffect::Update(UpdateEffect::Snap { seed }),
        )
        .with_cost(8)
        .once()
    }

    pub fn ai_shield() -> Self {
        Buff::new(
            "AI Shield",
            "Every ally gains 999 lives until the next turn.",
            BuffEffect::Update(UpdateEffect::AiShield { bonus: 999, shielded: false }),
        )
        .with_cost(7)
        .for_turns(1)
    }

    pub fn en_passant_capture() -> Self {
        Buff::new(
            "En Passant Capture",
            "Takes the pawn behind whoever lands here.",
            BuffEffect::Update(UpdateEffect::EnPassantCapture),
        )
        .once()
    }

    pub fn uno_reverse_guard(protects: PieceId) -> Self {
        Buff::new(
            "Uno Reverse Guard",
            "Reverses an enemy move onto this tile.",
            BuffEffect::Update(UpdateEffect::UnoReverseGuard { protects }),
        )
        .once()
    }

    /// Buffs every pawn of `color` spawns with
    pub fn pawn_defaults(color: Color, board_height: i32) -> Vec<Buff> {
        let promotion_rank = match color {
            Color::White => board_height - 1,
            Color::Black => 0,
        };
        vec![Buff::double_step(), Buff::en_passant(), Buff::promote(promotion_rank)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::Piece;

    fn board_with(pieces: &[(PieceKind, Color, &str)]) -> (Board, Vec<PieceId>) {
        let mut board = Board::new(8, 8).unwrap();
        let mut ids = Vec::new();
        for &(kind, color, at) in pieces {
            let id = board.push_piece(Piece::new(kind, color, standard_rules(kind, color)));
            board.place(id, at.parse().unwrap()).unwrap();
            ids.push(id);
        }
        (board, ids)
    }

    fn clock(turn: u32, round: u32) -> Clock {
        Clock {
            turn,
            round,
            ..Clock::default()
        }
    }

    #[test]
    fn test_turn_duration_expires() {
        let mut buff = Buff::throwing_hands().for_turns(2);
        buff.update_duration(clock(1, 0));
        assert!(buff.active);
        assert_eq!(buff.duration_turns, 1);
        buff.update_duration(clock(3, 0));
        assert_eq!(buff.duration_turns, 0);
        assert!(!buff.active);
    }

    #[test]
    fn test_unlimited_never_decrements() {
        let mut buff = Buff::lone_wolf();
        buff.update_duration(clock(40, 7));
        assert!(buff.active);
        assert_eq!(buff.duration_turns, UNLIMITED);
        assert_eq!(buff.duration_rounds, UNLIMITED);
    }

    #[test]
    fn test_inactive_buff_stays_inactive() {
        let mut buff = Buff::zoomies();
        buff.update_duration(clock(0, 1));
        assert!(!buff.active);
        for t in 0..5 {
            buff.update_duration(clock(t, 0));
            buff.update_duration(clock(t + 10, t + 10));
            assert!(!buff.active);
        }
    }

    #[test]
    fn test_one_time_buff_fires_once() {
        let (mut board, ids) = board_with(&[(PieceKind::Rook, Color::White, "a1")]);
        let mut buff = Buff::throwing_hands();
        let first = buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(first, Some(UpdateOutcome::Nothing));
        let second = buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(second, None);
        assert_eq!(board.piece(ids[0]).unwrap().strength, 2);
        assert!(buff.was_used && !buff.active);
    }

    #[test]
    fn test_wrong_receiver_is_rejected() {
        let (mut board, _) = board_with(&[(PieceKind::Rook, Color::White, "a1")]);
        let mut buff = Buff::built_different();
        let err = buff
            .apply_update(ChessObject::Tile(Coord::new(0, 0)), &mut board)
            .unwrap_err();
        assert!(matches!(err, BuffError::InvalidArgument { expected: "piece", got: "tile", .. }));
        assert!(buff.active);
    }

    #[test]
    fn test_double_step_from_home_rank_only() {
        let (board, _) = board_with(&[(PieceKind::Pawn, Color::White, "e2")]);
        let history = MoveHistory::default();
        let query = MoveQuery {
            board: &board,
            history: &history,
            origin: "e2".parse().unwrap(),
            color: Color::White,
            rules: &[],
        };
        assert_eq!(Buff::double_step().move_tiles(&query), vec!["e4".parse().unwrap()]);

        let query = MoveQuery { origin: "e3".parse().unwrap(), ..query };
        assert!(Buff::double_step().move_tiles(&query).is_empty());
    }

    #[test]
    fn test_double_step_blocked() {
        let (board, _) = board_with(&[
            (PieceKind::Pawn, Color::Black, "d7"),
            (PieceKind::Knight, Color::White, "d5"),
        ]);
        let history = MoveHistory::default();
        let query = MoveQuery {
            board: &board,
            history: &history,
            origin: "d7".parse().unwrap(),
            color: Color::Black,
            rules: &[],
        };
        assert!(Buff::double_step().move_tiles(&query).is_empty());
    }

    #[test]
    fn test_lone_wolf_toggles() {
        let (mut board, ids) = board_with(&[
            (PieceKind::Knight, Color::White, "d4"),
            (PieceKind::Pawn, Color::White, "h2"),
        ]);
        let mut buff = Buff::lone_wolf();
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(board.piece(ids[0]).unwrap().strength, 3);

        board.relocate(ids[1], "e5".parse().unwrap());
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(board.piece(ids[0]).unwrap().strength, 1);
        assert!(buff.active);
    }

    #[test]
    fn test_blessing_heals_allies_at_own_cost() {
        let (mut board, ids) = board_with(&[
            (PieceKind::Queen, Color::White, "d4"),
            (PieceKind::Pawn, Color::White, "c3"),
            (PieceKind::Pawn, Color::White, "e5"),
            (PieceKind::Pawn, Color::Black, "d5"),
        ]);
        board.set_lives(ids[0], 5);
        let mut buff = Buff::blessing_in_disguise();
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(board.piece(ids[0]).unwrap().lives, 3);
        assert_eq!(board.piece(ids[1]).unwrap().lives, 2);
        assert_eq!(board.piece(ids[2]).unwrap().lives, 2);
        assert_eq!(board.piece(ids[3]).unwrap().lives, 1);
    }

    #[test]
    fn test_skill_issue_has_a_floor() {
        let (mut board, ids) = board_with(&[
            (PieceKind::King, Color::White, "e1"),
            (PieceKind::Rook, Color::Black, "a8"),
            (PieceKind::Queen, Color::Black, "d8"),
        ]);
        board.set_strength(ids[2], 3);
        let mut buff = Buff::skill_issue();
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(board.piece(ids[1]).unwrap().strength, 1);
        assert_eq!(board.piece(ids[2]).unwrap().strength, 2);
    }

    #[test]
    fn test_zombie_rises_once_per_round() {
        let (mut board, ids) = board_with(&[(PieceKind::Knight, Color::White, "c3")]);
        let mut buff = Buff::zombie();
        assert_eq!(buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap(), None);

        board.damage(ids[0], 1);
        let risen = buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(risen, Some(UpdateOutcome::Revived(ids[0])));
        assert_eq!(board.piece_at("c3".parse().unwrap()).map(|p| p.lives), Some(1));

        board.damage(ids[0], 1);
        assert_eq!(buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap(), None);
        assert!(board.is_downed(ids[0]));
        assert!(buff.active);
    }

    #[test]
    fn test_installing_updates_flags_the_clock() {
        let (mut board, ids) = board_with(&[(PieceKind::King, Color::White, "e1")]);
        let mut buff = Buff::installing_updates();
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert!(board.clock().skip_round);
        assert!(!buff.active);
    }

    #[test]
    fn test_snap_spares_the_king_and_is_repeatable() {
        let mut layout = vec![
            (PieceKind::Rook, Color::White, "a1"),
            (PieceKind::King, Color::Black, "e8"),
        ];
        let squares = ["a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7"];
        layout.extend(squares.iter().map(|&sq| (PieceKind::Pawn, Color::Black, sq)));

        let (mut first, ids) = board_with(&layout);
        let (mut second, _) = board_with(&layout);
        let fallen = Buff::snap(3).apply_update(ChessObject::Piece(ids[0]), &mut first).unwrap();
        let again = Buff::snap(3).apply_update(ChessObject::Piece(ids[0]), &mut second).unwrap();
        assert_eq!(fallen, again);

        let Some(UpdateOutcome::Captured(fallen)) = fallen else {
            panic!("snap always reports its victims");
        };
        assert!(!fallen.contains(&ids[1]));
        assert!(first.piece(ids[1]).unwrap().active);
        assert_eq!(first.pieces_of(Color::Black).count(), 9 - fallen.len());
        assert!(first.is_consistent());
    }

    #[test]
    fn test_ai_shield_is_taken_back_on_expiry() {
        let (mut board, ids) = board_with(&[
            (PieceKind::Queen, Color::White, "d1"),
            (PieceKind::Pawn, Color::White, "a2"),
            (PieceKind::Pawn, Color::Black, "a7"),
        ]);
        board.set_lives(ids[1], 3);
        let mut buff = Buff::ai_shield();
        buff.apply_update(ChessObject::Piece(ids[0]), &mut board).unwrap();
        assert_eq!(board.piece(ids[0]).unwrap().lives, 1000);
        assert_eq!(board.piece(ids[1]).unwrap().lives, 1002);
        assert_eq!(board.piece(ids[2]).unwrap().lives, 1);

        buff.update_duration(clock(1, 0));
        assert!(!buff.active);
        buff.on_expire(ids[0], &mut board);
        assert_eq!(board.piece(ids[0]).unwrap().lives, 1);
        assert_eq!(board.piece(ids[1]).unwrap().lives, 3);
        buff.on_expire(ids[0], &mut board);
        assert_eq!(board.piece(ids[1]).unwrap().lives, 3);
    }

    #[test]
    fn test_pawn_defaults() {
        let buffs = Buff::pawn_defaults(Color::Black, 8);
        assert_eq!(buffs.len(), 3);
        assert_eq!(
            buffs[2].effect,
            BuffEffect::Update(UpdateEffect::Promote { rank: 0 })
        );
    }
}
