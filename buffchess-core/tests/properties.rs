//! Property tests: random playouts, exact undo and buff lifecycles

use buffchess_core::{
    board::Clock,
    buffs::Buff,
    game::{Game, MoveOptions},
    AiConfig, AiPlayer, Color, Coord, PieceKind,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Play up to `plies` random legal moves, checking board invariants as it goes
fn random_playout(game: &mut Game, seed: u64, plies: usize) -> Result<usize, TestCaseError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut played = 0;
    for _ in 0..plies {
        let side = game.side_to_move();
        let moves = game.legal_moves(side);
        if moves.is_empty() {
            break;
        }
        for mv in &moves {
            prop_assert!(game.board().contains(mv.to), "{} off the board", mv.to);
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        prop_assert!(game.make_move(mv.piece, mv.to, MoveOptions::ai()).is_ok());
        prop_assert!(game.board().is_consistent());
        played += 1;
    }
    Ok(played)
}

/// Something that can happen to a game in progress
#[derive(Clone, Copy, Debug)]
enum Step {
    Play,
    Spawn,
    TileBuff,
    PieceBuff,
    Search,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Play),
        1 => Just(Step::Spawn),
        1 => Just(Step::TileBuff),
        1 => Just(Step::PieceBuff),
        1 => Just(Step::Search),
    ]
}

fn random_move(game: &mut Game, rng: &mut ChaCha8Rng) -> bool {
    let moves = game.legal_moves(game.side_to_move());
    if moves.is_empty() {
        return false;
    }
    let mv = moves[rng.gen_range(0..moves.len())];
    game.make_move(mv.piece, mv.to, MoveOptions::ai()).is_ok()
}

fn random_empty_tile(game: &Game, rng: &mut ChaCha8Rng) -> Option<Coord> {
    let empty: Vec<Coord> = game
        .board()
        .tiles()
        .filter(|t| t.occupant().is_none())
        .map(|t| t.coord)
        .collect();
    (!empty.is_empty()).then(|| empty[rng.gen_range(0..empty.len())])
}

fn random_buff(rng: &mut ChaCha8Rng) -> Buff {
    match rng.gen_range(0..4) {
        0 => Buff::zoomies(),
        1 => Buff::throwing_hands(),
        2 => Buff::lone_wolf().for_turns(2),
        _ => Buff::zombie(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_undo_restores_the_opening(seed in any::<u64>(), plies in 1usize..40) {
        let mut game = Game::standard().unwrap();
        let snapshot = game.board().snapshot();
        let hash = game.board().position_hash();

        let played = random_playout(&mut game, seed, plies)?;
        prop_assert_eq!(game.history().len(), played);

        prop_assert_eq!(game.undo_moves(played + 3), played);
        prop_assert_eq!(game.board().snapshot(), snapshot);
        prop_assert_eq!(game.board().position_hash(), hash);
        prop_assert!(game.board().is_consistent());
        prop_assert!(game.history().is_empty());
    }

    #[test]
    fn prop_single_undo_is_exact(seed in any::<u64>(), plies in 0usize..20) {
        let mut game = Game::standard().unwrap();
        random_playout(&mut game, seed, plies)?;
        let side = game.side_to_move();
        let snapshot = game.board().snapshot();
        let hash = game.board().position_hash();

        let moves = game.legal_moves(side);
        prop_assume!(!moves.is_empty());
        let mv = moves[(seed as usize) % moves.len()];
        game.make_move(mv.piece, mv.to, MoveOptions::ai()).unwrap();
        prop_assert!(game.undo_last_move());

        prop_assert_eq!(game.board().snapshot(), snapshot);
        prop_assert_eq!(game.board().position_hash(), hash);
        prop_assert_eq!(game.side_to_move(), side);
    }

    #[test]
    fn prop_edits_between_moves_undo_with_their_move(
        seed in any::<u64>(),
        steps in prop::collection::vec(step(), 1..30),
    ) {
        let mut game = Game::standard().unwrap();
        let snapshot = game.board().snapshot();
        let hash = game.board().position_hash();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        prop_assume!(random_move(&mut game, &mut rng));

        for step in steps {
            match step {
                Step::Play => {
                    random_move(&mut game, &mut rng);
                }
                Step::Spawn => {
                    let kinds = [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook];
                    let kind = kinds[rng.gen_range(0..kinds.len())];
                    let color = if rng.gen_bool(0.5) { Color::White } else { Color::Black };
                    if let Some(at) = random_empty_tile(&game, &mut rng) {
                        prop_assert!(game.spawn_piece(kind, color, at, None).is_ok());
                    }
                }
                Step::TileBuff => {
                    let tiles: Vec<Coord> = game.board().tiles().map(|t| t.coord).collect();
                    let at = tiles[rng.gen_range(0..tiles.len())];
                    prop_assert!(game.add_tile_buff(at, random_buff(&mut rng)).is_ok());
                }
                Step::PieceBuff => {
                    let ids: Vec<_> = game.board().active_pieces().map(|p| p.id).collect();
                    let id = ids[rng.gen_range(0..ids.len())];
                    prop_assert!(game.add_piece_buff(id, random_buff(&mut rng)).is_ok());
                }
                Step::Search => {
                    let before = game.board().position_hash();
                    let depth = game.history().len();
                    let side = game.side_to_move();
                    let mut ai = AiPlayer::with_seed(AiConfig::with_depth(2).instant(), seed);
                    ai.find_best_move(&mut game, side);
                    prop_assert_eq!(game.board().position_hash(), before);
                    prop_assert_eq!(game.history().len(), depth);
                }
            }
            prop_assert!(game.board().is_consistent());
        }

        let played = game.history().len();
        prop_assert_eq!(game.undo_moves(played), played);
        prop_assert_eq!(game.board().snapshot(), snapshot);
        prop_assert_eq!(game.board().position_hash(), hash);
        prop_assert!(game.board().is_consistent());
    }

    #[test]
    fn prop_inactive_buffs_stay_inactive(
        turns in prop::collection::vec(0u32..50, 1..20),
        rounds in prop::collection::vec(0u32..10, 1..20),
        duration in 1i32..5,
    ) {
        let mut buff = Buff::lone_wolf().for_turns(duration);
        let mut was_inactive = false;
        for (turn, round) in turns.iter().zip(rounds.iter().cycle()) {
            buff.update_duration(Clock { turn: *turn, round: *round, ..Clock::default() });
            if was_inactive {
                prop_assert!(!buff.active);
            }
            was_inactive |= !buff.active;
            prop_assert!(buff.duration_turns >= 0);
        }
    }
}
