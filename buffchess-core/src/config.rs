//! Game and AI configuration
//!
//! Everything here round-trips through JSON so a match can be described in
//! a file and loaded by the CLI.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::eval::Heuristics;
use crate::pieces::PieceKind;

/// Shallowest search the AI accepts
pub const MIN_SEARCH_DEPTH: u32 = 1;
/// Deepest search the AI accepts
pub const MAX_SEARCH_DEPTH: u32 = 6;

// ============================================================================
// AI
// ============================================================================

/// Search and pacing parameters for one AI player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Plies searched, 1..=6
    pub search_depth: u32,
    /// Lower bound of the cosmetic thinking delay
    pub thinking_min_ms: u64,
    /// Upper bound of the cosmetic thinking delay
    pub thinking_max_ms: u64,
    /// Root score jitter, 0 disables it
    pub randomness: f32,
    /// Candidate moves kept below the root
    pub max_branching: usize,
    /// Drop moves that leave the mover's own king attacked
    pub avoid_self_check: bool,
    /// Evaluation weights
    pub heuristics: Heuristics,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            search_depth: 3,
            thinking_min_ms: 500,
            thinking_max_ms: 2000,
            randomness: 0.1,
            max_branching: 20,
            avoid_self_check: false,
            heuristics: Heuristics::default(),
        }
    }
}

impl AiConfig {
    /// Config searching `depth` plies, clamped to the supported range
    pub fn with_depth(depth: u32) -> Self {
        Self {
            search_depth: depth.clamp(MIN_SEARCH_DEPTH, MAX_SEARCH_DEPTH),
            ..Default::default()
        }
    }

    pub fn set_search_depth(&mut self, depth: u32) {
        self.search_depth = depth.clamp(MIN_SEARCH_DEPTH, MAX_SEARCH_DEPTH);
    }

    /// No thinking delay and no jitter: fully reproducible, instant replies
    pub fn instant(mut self) -> Self {
        self.thinking_min_ms = 0;
        self.thinking_max_ms = 0;
        self.randomness = 0.0;
        self
    }

    pub fn with_randomness(mut self, randomness: f32) -> Self {
        self.randomness = randomness.max(0.0);
        self
    }

    pub fn thinking_range(&self) -> (Duration, Duration) {
        let lo = self.thinking_min_ms.min(self.thinking_max_ms);
        let hi = self.thinking_min_ms.max(self.thinking_max_ms);
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

/// Named difficulty presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }

    /// Depth and average thinking time in milliseconds
    fn settings(self) -> (u32, u64) {
        match self {
            Difficulty::Easy => (2, 500),
            Difficulty::Medium => (3, 1000),
            Difficulty::Hard => (4, 1500),
            Difficulty::Expert => (5, 2000),
        }
    }

    pub fn config(self) -> AiConfig {
        let (depth, think_ms) = self.settings();
        AiConfig {
            search_depth: depth,
            thinking_min_ms: think_ms / 2,
            thinking_max_ms: think_ms + think_ms / 2,
            ..AiConfig::default()
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown difficulty '{s}'"))
    }
}

// ============================================================================
// GAME
// ============================================================================

/// Promotion dialog contents
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    pub candidates: Vec<PieceKind>,
    pub tooltips: Vec<String>,
    pub title: String,
    pub confirm: String,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            candidates: vec![
                PieceKind::Queen,
                PieceKind::Rook,
                PieceKind::Bishop,
                PieceKind::Knight,
            ],
            tooltips: vec![
                "Queen: moves any distance in any direction.".to_string(),
                "Rook: moves any distance along ranks and files.".to_string(),
                "Bishop: moves any distance diagonally.".to_string(),
                "Knight: leaps in an L shape.".to_string(),
            ],
            title: "Royal Ascension".to_string(),
            confirm: "Promote".to_string(),
        }
    }
}

/// Opening position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SetupMode {
    /// Standard chess armies on both sides
    Traditional,
    /// White army against a named enemy round
    Round(String),
    /// White army against a generated layout for this level
    Level(u32),
    /// Empty board
    Empty,
}

/// Everything needed to start a game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    pub setup: SetupMode,
    pub promotion: PromotionConfig,
    pub white_ai: AiConfig,
    pub black_ai: AiConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            setup: SetupMode::Traditional,
            promotion: PromotionConfig::default(),
            white_ai: AiConfig::default(),
            black_ai: AiConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
