//! Play command - one AI vs AI game
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), play_game(), report_result()
//! - Level 3: take_turn(), print_events()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use buffchess_core::{
    AiConfig, AiMove, AiPlayer, Color, Difficulty, Game, GameConfig, GameEvent, GameState,
    SetupMode,
};

use crate::render::render_board;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Game config JSON file; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named enemy round for Black
    #[arg(long, conflicts_with = "level")]
    pub round: Option<String>,

    /// Campaign level for Black, generated past the round database
    #[arg(long)]
    pub level: Option<u32>,

    /// Difficulty preset for both players
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// White search depth (1-6)
    #[arg(long)]
    pub white_depth: Option<u32>,

    /// Black search depth (1-6)
    #[arg(long)]
    pub black_depth: Option<u32>,

    /// Score jitter for both players; 0 plays the top-scored move
    #[arg(long, value_name = "AMOUNT")]
    pub randomness: Option<f32>,

    /// Stop after this many moves
    #[arg(long, default_value = "200")]
    pub max_moves: usize,

    /// Wait out each AI's thinking delay before it moves
    #[arg(long)]
    pub pace: bool,

    /// Print the board after every move
    #[arg(long)]
    pub show_board: bool,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of one game
#[derive(Clone, Debug, Serialize)]
struct GameRecord {
    setup: String,
    result: GameState,
    moves: usize,
    turns: u32,
    white_pieces: usize,
    black_pieces: usize,
    log: Vec<String>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Build the game config from file and flags
/// 2. Play until the game ends or the move cap is hit
/// 3. Report the result
pub async fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let config = build_config(&args)?;
    let mut game = Game::from_config(&config).context("setting up the board")?;

    tracing::info!(
        setup = ?config.setup,
        white_depth = config.white_ai.search_depth,
        black_depth = config.black_ai.search_depth,
        "Starting game"
    );

    let record = play_game(&mut game, &config, &args, seed).await;

    report_result(&record, &game, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Merge the optional config file with command-line overrides
fn build_config(args: &PlayArgs) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load game config: {}", path.display()))?,
        None => GameConfig::default(),
    };

    if let Some(name) = &args.round {
        config.setup = SetupMode::Round(name.clone());
    }
    if let Some(level) = args.level {
        config.setup = SetupMode::Level(level);
    }
    if let Some(difficulty) = args.difficulty {
        config.white_ai = difficulty.config();
        config.black_ai = difficulty.config();
    }
    if let Some(depth) = args.white_depth {
        config.white_ai.set_search_depth(depth);
    }
    if let Some(depth) = args.black_depth {
        config.black_ai.set_search_depth(depth);
    }
    if let Some(randomness) = args.randomness {
        config.white_ai = config.white_ai.with_randomness(randomness);
        config.black_ai = config.black_ai.with_randomness(randomness);
    }
    if !args.pace {
        config.white_ai = without_delay(config.white_ai);
        config.black_ai = without_delay(config.black_ai);
    }

    Ok(config)
}

/// Alternate the two AI players until someone wins or the cap is reached
async fn play_game(
    game: &mut Game,
    config: &GameConfig,
    args: &PlayArgs,
    seed: Option<u64>,
) -> GameRecord {
    let (white, black) = create_players(config, seed);
    let mut players = [white, black];
    let mut log = Vec::new();
    let mut moves = 0;

    print_events(game, args, &mut log);

    let result = loop {
        let side = game.side_to_move();
        let state = game.check_game_state(side);
        if state.is_over() {
            break state;
        }
        if moves >= args.max_moves {
            tracing::info!(moves, "Move cap reached");
            break GameState::Ongoing;
        }

        let player = &mut players[player_index(side)];
        let Some(choice) = take_turn(player, game, side, args.pace).await else {
            break GameState::Ongoing;
        };
        moves += 1;

        tracing::debug!(
            color = side.name(),
            from = %choice.mv.from,
            to = %choice.mv.to,
            score = choice.score,
            "AI moved"
        );
        print_events(game, args, &mut log);
        if args.show_board && !args.json {
            println!("{}", render_board(game.board()));
        }
    };

    GameRecord {
        setup: setup_label(&config.setup),
        result,
        moves,
        turns: game.clock().turn,
        white_pieces: game.board().pieces_of(Color::White).count(),
        black_pieces: game.board().pieces_of(Color::Black).count(),
        log,
    }
}

/// Print the final board and result
fn report_result(record: &GameRecord, game: &Game, args: &PlayArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("\n{}", render_board(game.board()));
    println!("=== Game Result ===");
    println!("Setup:   {}", record.setup);
    println!("Result:  {}", result_label(record.result));
    println!("Moves:   {} ({} full turns)", record.moves, record.turns);
    println!(
        "Pieces:  White {} / Black {}",
        record.white_pieces, record.black_pieces
    );
    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// One AI move, paced by the player's thinking delay when asked
async fn take_turn(
    player: &mut AiPlayer,
    game: &mut Game,
    side: Color,
    pace: bool,
) -> Option<AiMove> {
    if !pace {
        return player.make_best_move(game, side);
    }
    let thinking = player.begin_thinking(side)?;
    tokio::time::sleep(thinking.delay).await;
    player.finish_thinking(game, thinking)
}

/// Drain game events into the move log, echoing them unless output is JSON
fn print_events(game: &mut Game, args: &PlayArgs, log: &mut Vec<String>) {
    for event in game.drain_events() {
        match event {
            GameEvent::Notification(line) => {
                if !args.json {
                    println!("{line}");
                }
                log.push(line);
            }
            GameEvent::GameEnded(state) => {
                tracing::info!(result = result_label(state), "Game ended");
            }
            _ => {}
        }
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// White and Black players with distinct seeds
fn create_players(config: &GameConfig, seed: Option<u64>) -> (AiPlayer, AiPlayer) {
    match seed {
        Some(s) => (
            AiPlayer::with_seed(config.white_ai.clone(), s),
            AiPlayer::with_seed(config.black_ai.clone(), s.wrapping_add(1)),
        ),
        None => (
            AiPlayer::with_seed(config.white_ai.clone(), rand::random()),
            AiPlayer::with_seed(config.black_ai.clone(), rand::random()),
        ),
    }
}

fn without_delay(mut config: AiConfig) -> AiConfig {
    config.thinking_min_ms = 0;
    config.thinking_max_ms = 0;
    config
}

fn player_index(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

fn setup_label(setup: &SetupMode) -> String {
    match setup {
        SetupMode::Traditional => "Traditional".to_string(),
        SetupMode::Round(name) => format!("Round: {name}"),
        SetupMode::Level(level) => format!("Level {level}"),
        SetupMode::Empty => "Empty".to_string(),
    }
}

fn result_label(state: GameState) -> &'static str {
    match state {
        GameState::Ongoing => "Unfinished",
        GameState::WhiteWins => "White wins",
        GameState::BlackWins => "Black wins",
        GameState::Stalemate => "Stalemate",
    }
}
