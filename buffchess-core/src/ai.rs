//! Minimax AI with alpha-beta pruning
//!
//! The search explores the real game: every candidate is applied with
//! [`Game::probe_move`] and reverted with [`Game::undo_probe`] before the
//! next sibling is tried, so a finished search leaves the position exactly
//! as it found it.

use std::cmp::Reverse;
use std::time::Duration;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::AiConfig;
use crate::eval::{center_bonus, evaluate_position, PieceValues};
use crate::game::{Game, Move, MoveOptions};
use crate::pieces::Color;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Score of a mate delivered at the root
pub const MATE_SCORE: i32 = 20000;

/// Search window bound, beyond any reachable score
const INFINITY: i32 = 1_000_000;

/// Default seed for the search RNG
const DEFAULT_SEED: u64 = 42;

// ============================================================================
// SEARCH
// ============================================================================

/// Chosen move and its score from the mover's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AiMove {
    pub mv: Move,
    pub score: i32,
}

/// One search from the point of view of `root`
pub struct Search<'a> {
    config: &'a AiConfig,
    rng: &'a mut ChaCha8Rng,
    root: Color,
    nodes: u64,
}

impl<'a> Search<'a> {
    pub fn new(config: &'a AiConfig, rng: &'a mut ChaCha8Rng, root: Color) -> Self {
        Self {
            config,
            rng,
            root,
            nodes: 0,
        }
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Minimax value of the position, positive when good for the root side
    ///
    /// `maximizing` is true when the root side is to move. A side with no
    /// moves scores as mated (if in check) or stalemated before the depth
    /// cutoff is considered, so terminal positions are exact at any depth.
    pub fn minimax(
        &mut self,
        game: &mut Game,
        depth: u32,
        ply: u32,
        maximizing: bool,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.nodes += 1;
        let side = if maximizing {
            self.root
        } else {
            self.root.opponent()
        };

        let moves = self.legal_moves(game, side);
        if moves.is_empty() {
            return self.terminal_score(game, side, ply);
        }
        if depth == 0 {
            return evaluate_position(game, self.root, &self.config.heuristics);
        }
        let moves = self.order(game, moves, ply);

        if maximizing {
            let mut best = -INFINITY;
            for mv in moves {
                game.probe_move(mv);
                let score = self.minimax(game, depth - 1, ply + 1, false, alpha, beta);
                game.undo_probe();

                best = best.max(score);
                alpha = alpha.max(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        } else {
            let mut best = INFINITY;
            for mv in moves {
                game.probe_move(mv);
                let score = self.minimax(game, depth - 1, ply + 1, true, alpha, beta);
                game.undo_probe();

                best = best.min(score);
                beta = beta.min(score);
                if beta <= alpha {
                    break;
                }
            }
            best
        }
    }

    fn terminal_score(&self, game: &Game, side: Color, ply: u32) -> i32 {
        if !game.is_in_check(side) {
            return 0;
        }
        let ply = ply as i32;
        if side == self.root {
            -MATE_SCORE + ply
        } else {
            MATE_SCORE - ply
        }
    }

    fn legal_moves(&self, game: &mut Game, side: Color) -> Vec<Move> {
        let mut moves = game.legal_moves(side);
        if self.config.avoid_self_check {
            moves.retain(|&mv| !leaves_king_attacked(game, mv, side));
        }
        moves
    }

    /// Shuffle, then stable sort by ordering score; truncate below the root
    fn order(&mut self, game: &Game, mut moves: Vec<Move>, ply: u32) -> Vec<Move> {
        moves.shuffle(&mut *self.rng);
        let values = &self.config.heuristics.piece_values;
        moves.sort_by_key(|mv| Reverse(move_score(game, mv, values)));
        if ply > 0 {
            moves.truncate(self.config.max_branching.max(1));
        }
        moves
    }
}

fn leaves_king_attacked(game: &mut Game, mv: Move, side: Color) -> bool {
    game.probe_move(mv);
    let attacked = game.is_in_check(side);
    game.undo_probe();
    attacked
}

// ============================================================================
// MOVE ORDERING
// ============================================================================

/// MVV-LVA capture score plus a preference for central destinations
fn move_score(game: &Game, mv: &Move, values: &PieceValues) -> i32 {
    let board = game.board();
    let Some(attacker) = board.piece(mv.piece) else {
        return 0;
    };
    let capture = board
        .piece_at(mv.to)
        .filter(|victim| victim.color != attacker.color)
        .map_or(0, |victim| values.of(victim.kind) - values.of(attacker.kind) / 10);
    capture + center_bonus(mv.to)
}

// ============================================================================
// AI PLAYER
// ============================================================================

/// A pending AI turn: wait out `delay`, then call [`AiPlayer::finish_thinking`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thinking {
    pub color: Color,
    pub delay: Duration,
}

pub struct AiPlayer {
    pub config: AiConfig,
    rng: ChaCha8Rng,
    /// Only draws thinking delays, so pacing never shifts search randomness
    pacing_rng: ChaCha8Rng,
    thinking: bool,
}

impl AiPlayer {
    pub fn new(config: AiConfig) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pacing_rng: ChaCha8Rng::seed_from_u64(seed.rotate_left(32) ^ 0x9e37_79b9),
            thinking: false,
        }
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    /// Search for the best move of `color` without committing it
    ///
    /// Returns `None` while a promotion choice is outstanding; the board is
    /// mid-move until [`Game::on_promotion_selected`] settles it.
    pub fn find_best_move(&mut self, game: &mut Game, color: Color) -> Option<AiMove> {
        if game.pending_promotion().is_some() {
            tracing::warn!(color = color.name(), "promotion pending, AI will not search");
            return None;
        }
        let config = &self.config;
        let depth = config.search_depth.max(1);
        let mut search = Search::new(config, &mut self.rng, color);

        let moves = search.legal_moves(game, color);
        if moves.is_empty() {
            tracing::warn!(color = color.name(), "no valid moves found for AI");
            return None;
        }
        let moves = search.order(game, moves, 0);

        let mut best: Option<AiMove> = None;
        for mv in moves {
            game.probe_move(mv);
            let mut score = search.minimax(game, depth - 1, 1, false, -INFINITY, INFINITY);
            game.undo_probe();

            if config.randomness > 0.0 {
                score += (search.rng.gen::<f32>() * config.randomness * 100.0) as i32;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(AiMove { mv, score });
            }
        }

        if let Some(choice) = best {
            tracing::debug!(
                color = color.name(),
                depth,
                nodes = search.nodes(),
                score = choice.score,
                from = %choice.mv.from,
                to = %choice.mv.to,
                "search finished"
            );
        }
        best
    }

    /// Search and commit the best move straight away
    pub fn make_best_move(&mut self, game: &mut Game, color: Color) -> Option<AiMove> {
        let choice = self.find_best_move(game, color)?;
        match game.make_move(choice.mv.piece, choice.mv.to, MoveOptions::ai()) {
            Ok(_) => Some(choice),
            Err(e) => {
                tracing::warn!(%e, "AI move rejected");
                None
            }
        }
    }

    /// Start a paced turn; `None` while another turn is being thought about
    pub fn begin_thinking(&mut self, color: Color) -> Option<Thinking> {
        if self.thinking {
            return None;
        }
        self.thinking = true;
        let (lo, hi) = self.config.thinking_range();
        let ms = self
            .pacing_rng
            .gen_range(lo.as_millis() as u64..=hi.as_millis() as u64);
        Some(Thinking {
            color,
            delay: Duration::from_millis(ms),
        })
    }

    /// Complete a paced turn once its delay has elapsed
    pub fn finish_thinking(&mut self, game: &mut Game, thinking: Thinking) -> Option<AiMove> {
        let choice = self.make_best_move(game, thinking.color);
        self.thinking = false;
        choice
    }

    /// Static evaluation with this player's weights
    pub fn evaluate(&self, game: &Game, color: Color) -> i32 {
        evaluate_position(game, color, &self.config.heuristics)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::pieces::PieceKind;
    use crate::rules::MoveRule;

    fn c(s: &str) -> Coord {
        s.parse().unwrap()
    }

    fn player(depth: u32) -> AiPlayer {
        AiPlayer::new(AiConfig::with_depth(depth).instant())
    }

    #[test]
    fn test_ai_returns_move() {
        let mut game = Game::standard().unwrap();
        let choice = player(2).find_best_move(&mut game, Color::White);
        assert!(choice.is_some());
    }

    #[test]
    fn test_ai_takes_hanging_queen() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("h1"), None).unwrap();
        game.spawn_piece(PieceKind::Rook, Color::White, c("a1"), None).unwrap();
        game.spawn_piece(PieceKind::King, Color::Black, c("h8"), None).unwrap();
        game.spawn_piece(PieceKind::Queen, Color::Black, c("a5"), None).unwrap();

        let choice = player(1).find_best_move(&mut game, Color::White).unwrap();
        assert_eq!(choice.mv.to, c("a5"));
    }

    #[test]
    fn test_search_leaves_position_untouched() {
        let mut game = Game::standard().unwrap();
        let hash = game.board().position_hash();
        let before = evaluate_position(&game, Color::White, &Default::default());
        player(3).find_best_move(&mut game, Color::White);
        assert_eq!(game.board().position_hash(), hash);
        assert_eq!(evaluate_position(&game, Color::White, &Default::default()), before);
        assert!(game.history().is_empty());
        assert_eq!(game.side_to_move(), Color::White);
    }

    #[test]
    fn test_same_seed_same_move() {
        let mut game = Game::standard().unwrap();
        let config = AiConfig::with_depth(2);
        let a = AiPlayer::with_seed(config.clone(), 7).find_best_move(&mut game, Color::White);
        let b = AiPlayer::with_seed(config, 7).find_best_move(&mut game, Color::White);
        assert_eq!(a, b);
    }

    #[test]
    fn test_stalemate_scores_zero_at_depth_zero() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::Pawn, Color::White, c("a4"), None).unwrap();
        game.spawn_piece(PieceKind::Pawn, Color::Black, c("a5"), None).unwrap();
        game.spawn_piece(PieceKind::Queen, Color::Black, c("h8"), None).unwrap();

        let config = AiConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut search = Search::new(&config, &mut rng, Color::White);
        assert_eq!(search.minimax(&mut game, 0, 0, true, -INFINITY, INFINITY), 0);
    }

    #[test]
    fn test_mated_root_scores_minus_mate() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("h1"), None).unwrap();
        game.spawn_piece(PieceKind::Knight, Color::Black, c("g3"), None).unwrap();
        for at in ["g1", "g2", "h2"] {
            let rules = vec![MoveRule::step(0, 1).no_capture()];
            game.spawn_piece(PieceKind::Custom, Color::White, c(at), Some(rules)).unwrap();
        }
        game.spawn_piece(PieceKind::Pawn, Color::Black, c("h3"), None).unwrap();

        let config = AiConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut white = Search::new(&config, &mut rng, Color::White);
        assert_eq!(white.minimax(&mut game, 3, 2, true, -INFINITY, INFINITY), -MATE_SCORE + 2);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut black = Search::new(&config, &mut rng, Color::Black);
        assert_eq!(black.minimax(&mut game, 3, 1, false, -INFINITY, INFINITY), MATE_SCORE - 1);
    }

    #[test]
    fn test_ordering_prefers_big_captures() {
        let mut game = Game::new(8, 8).unwrap();
        let rook = game.spawn_piece(PieceKind::Rook, Color::White, c("d4"), None).unwrap();
        game.spawn_piece(PieceKind::Queen, Color::Black, c("d8"), None).unwrap();
        game.spawn_piece(PieceKind::Pawn, Color::Black, c("a4"), None).unwrap();
        let values = PieceValues::default();
        let score = |to: &str| {
            let mv = Move { piece: rook, from: c("d4"), to: c(to) };
            move_score(&game, &mv, &values)
        };
        assert!(score("d8") > score("a4"));
        assert!(score("a4") > score("e4"));
    }

    #[test]
    fn test_self_check_filter() {
        // The pinned rook may only move along the pin when filtering
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("e1"), None).unwrap();
        let rook = game.spawn_piece(PieceKind::Rook, Color::White, c("e2"), None).unwrap();
        game.spawn_piece(PieceKind::Rook, Color::Black, c("e8"), None).unwrap();

        let mut config = AiConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let unfiltered =
            Search::new(&config, &mut rng, Color::White).legal_moves(&mut game, Color::White);
        assert!(unfiltered.iter().any(|m| m.piece == rook && m.to == c("a2")));

        config.avoid_self_check = true;
        let filtered =
            Search::new(&config, &mut rng, Color::White).legal_moves(&mut game, Color::White);
        assert!(filtered.iter().filter(|m| m.piece == rook).all(|m| m.to.x == 4));
        assert!(game.board().is_consistent());
    }

    #[test]
    fn test_no_search_while_promotion_pending() {
        let mut game = Game::new(8, 8).unwrap();
        game.spawn_piece(PieceKind::King, Color::White, c("a1"), None).unwrap();
        game.spawn_piece(PieceKind::King, Color::Black, c("h8"), None).unwrap();
        let pawn = game.spawn_piece(PieceKind::Pawn, Color::White, c("d7"), None).unwrap();
        game.move_piece(pawn, c("d8")).unwrap();
        let request = game.pending_promotion().cloned().unwrap();
        let hash = game.board().position_hash();

        let mut ai = player(2);
        assert!(ai.find_best_move(&mut game, Color::Black).is_none());
        assert!(ai.make_best_move(&mut game, Color::Black).is_none());
        assert_eq!(game.pending_promotion(), Some(&request));
        assert_eq!(game.board().position_hash(), hash);
        assert_eq!(game.history().len(), 1);

        let queen = game.on_promotion_selected(PieceKind::Queen).unwrap();
        assert_eq!(game.board().piece_at(c("d8")).unwrap().id, queen);
        assert!(ai.find_best_move(&mut game, Color::Black).is_some());
    }

    #[test]
    fn test_thinking_is_exclusive() {
        let mut ai = AiPlayer::new(AiConfig::with_depth(1));
        let thinking = ai.begin_thinking(Color::White).unwrap();
        let (lo, hi) = ai.config.thinking_range();
        assert!(thinking.delay >= lo && thinking.delay <= hi);
        assert!(ai.begin_thinking(Color::White).is_none());

        let mut game = Game::standard().unwrap();
        assert!(ai.finish_thinking(&mut game, thinking).is_some());
        assert!(!ai.is_thinking());
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.side_to_move(), Color::Black);
    }

    #[test]
    fn test_pacing_does_not_change_the_choice() {
        let mut game = Game::standard().unwrap();
        let config = AiConfig::with_depth(2);
        let direct = AiPlayer::with_seed(config.clone(), 3).find_best_move(&mut game, Color::White);

        let mut paced = AiPlayer::with_seed(config, 3);
        let thinking = paced.begin_thinking(Color::White).unwrap();
        let chosen = paced.finish_thinking(&mut game, thinking);
        assert_eq!(direct, chosen);
    }
}
