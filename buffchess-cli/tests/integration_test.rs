//! Integration tests for the buffchess binary
//!
//! Runs the real executable and checks its JSON output.

use std::path::PathBuf;
use std::process::{Command, Output};

use buffchess_core::{AiConfig, GameConfig, SetupMode};
use serde_json::Value;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn buffchess(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_buffchess"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run buffchess")
}

fn json_stdout(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn quick_game(extra: &[&str]) -> Value {
    let mut args = vec![
        "play",
        "--json",
        "--white-depth",
        "1",
        "--black-depth",
        "1",
        "--seed",
        "11",
    ];
    args.extend_from_slice(extra);
    json_stdout(&buffchess(&args))
}

fn temp_config(name: &str, config: &GameConfig) -> PathBuf {
    let path = std::env::temp_dir().join(format!("buffchess-{}-{}.json", name, std::process::id()));
    config.save(&path).unwrap();
    path
}

// ============================================================================
// ROUNDS
// ============================================================================

#[test]
fn test_rounds_lists_database() {
    let rounds = json_stdout(&buffchess(&["rounds", "--json"]));
    let rounds = rounds.as_array().unwrap();
    assert_eq!(rounds.len(), 20);
    assert_eq!(rounds[0]["name"], "The Siege Line");
    assert_eq!(rounds[19]["name"], "Final Boss: Dread Throne");
}

// ============================================================================
// PLAY
// ============================================================================

#[test]
fn test_play_stops_at_move_cap() {
    let record = quick_game(&["--max-moves", "4"]);
    assert_eq!(record["moves"], 4);
    assert_eq!(record["turns"], 2);
    assert_eq!(record["result"], "Ongoing");
    assert_eq!(record["setup"], "Traditional");
    assert_eq!(record["log"].as_array().unwrap().len(), 4);
}

#[test]
fn test_play_is_reproducible_with_seed() {
    let a = quick_game(&["--max-moves", "10"]);
    let b = quick_game(&["--max-moves", "10"]);
    assert_eq!(a["log"], b["log"]);
}

#[test]
fn test_play_against_named_round() {
    let record = quick_game(&["--round", "cavalry charge", "--max-moves", "0"]);
    assert_eq!(record["setup"], "Round: cavalry charge");
    assert_eq!(record["moves"], 0);
    assert_eq!(record["white_pieces"], 16);
    assert_eq!(record["black_pieces"], 7);
}

#[test]
fn test_unknown_round_fails() {
    let output = buffchess(&["play", "--round", "Nowhere", "--json"]);
    assert!(!output.status.success());
}

#[test]
fn test_round_and_level_conflict() {
    let output = buffchess(&["play", "--round", "Lurkers", "--level", "3"]);
    assert!(!output.status.success());
}

#[test]
fn test_play_from_config_file() {
    let config = GameConfig {
        setup: SetupMode::Level(40),
        white_ai: AiConfig::with_depth(1).instant(),
        black_ai: AiConfig::with_depth(1).instant(),
        ..Default::default()
    };
    let path = temp_config("level", &config);
    let record = quick_game(&["--config", path.to_str().unwrap(), "--max-moves", "2"]);
    std::fs::remove_file(&path).ok();

    assert_eq!(record["setup"], "Level 40");
    assert!(record["moves"].as_u64().unwrap() <= 2);
}

#[test]
fn test_bad_config_file_fails() {
    let path = std::env::temp_dir().join(format!("buffchess-bad-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();
    let output = buffchess(&["play", "--config", path.to_str().unwrap()]);
    std::fs::remove_file(&path).ok();
    assert!(!output.status.success());
}
