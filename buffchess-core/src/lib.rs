//! BuffChess Core - Game engine and AI
//!
//! This crate provides the core game logic for BuffChess:
//! - Board grid, tiles and the piece arena
//! - Directional move rules and the ray-walking generator
//! - Buffs: move and update effects on pieces and tiles
//! - Journalled move execution with exact undo
//! - Check, checkmate and stalemate detection
//! - Static evaluation and a minimax AI with alpha-beta pruning

pub mod board;
pub mod rules;
pub mod pieces;
pub mod buffs;
pub mod history;
pub mod events;
pub mod error;
pub mod config;
pub mod game;
pub mod state;
pub mod eval;
pub mod ai;
pub mod rounds;

// Re-exports for convenient access
pub use board::{Board, BoardSnapshot, Clock, Coord, Tile};
pub use rules::{valid_tiles, MoveRule, UNBOUNDED};
pub use pieces::{Color, Piece, PieceId, PieceKind};
pub use buffs::{Buff, BuffEffect, ChessObject, MoveEffect, UpdateEffect, UNLIMITED};
pub use history::{MoveHistory, MoveOutcome, MoveRecord};
pub use events::{GameEvent, PromotionRequest};
pub use error::{BuffError, GameError};
pub use config::{AiConfig, Difficulty, GameConfig, PromotionConfig, SetupMode};
pub use game::{BoardLayout, Game, Move, MoveOptions, PieceSpec, PromotionPolicy, TileSpec};
pub use state::GameState;
pub use eval::{evaluate_position, Heuristics, PieceValues};
pub use ai::{AiMove, AiPlayer, Search, Thinking, MATE_SCORE};
pub use rounds::{generate_enemy_round, EnemyRound};
