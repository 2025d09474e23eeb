//! BuffChess CLI - Command-line interface
//!
//! Commands:
//! - play: AI vs AI game on a traditional, round or level setup
//! - rounds: List the hand-authored enemy rounds

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod play_cmd;
mod render;

use play_cmd::PlayArgs;

#[derive(Parser)]
#[command(name = "buffchess")]
#[command(about = "Chess with buffs, undo and a minimax AI")]
struct Cli {
    /// RNG seed for reproducible games
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game between two AI players
    Play(PlayArgs),
    /// List the enemy round database
    Rounds {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play_cmd::run(args, cli.seed).await,
        Commands::Rounds { json } => list_rounds(json),
    }
}

fn list_rounds(json: bool) -> Result<()> {
    let rounds = buffchess_core::EnemyRound::database();
    if json {
        println!("{}", serde_json::to_string_pretty(&rounds)?);
        return Ok(());
    }

    println!("{:>3}  {:<28} {:>6}", "#", "Round", "Pieces");
    for (i, round) in rounds.iter().enumerate() {
        println!("{:>3}  {:<28} {:>6}", i + 1, round.name, round.pieces.len());
    }
    Ok(())
}
