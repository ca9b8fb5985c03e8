//! Engine configuration
//!
//! Everything a session needs besides the game itself: mode, which bot plays
//! and as whom, search limits and pacing. Loadable from JSON with every field
//! optional.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::Player;
use crate::error::Result;
use crate::eval::EvalWeights;

/// Who is on the other side of the board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Hot-seat on one device
    #[default]
    TwoPlayer,
    /// Human against the selected bot
    SinglePlayer,
    /// Moves mirrored to and from a remote peer
    Online,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: GameMode,
    /// Registry id of the bot used in single-player mode
    pub selected_bot: String,
    /// Side the bot plays in single-player mode
    pub bot_player: Player,
    pub hard_depth: u32,
    /// Soft wall-clock budget for one Expert move
    pub expert_budget_ms: u64,
    pub expert_max_depth: u32,
    /// Delay before a Random or Greedy move lands
    pub pacing_delay_ms: u64,
    /// Random seed for reproducibility (None = entropy)
    pub seed: Option<u64>,
    pub weights: EvalWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::TwoPlayer,
            selected_bot: "random".to_string(),
            bot_player: Player::Second,
            hard_depth: 5,
            expert_budget_ms: 5000,
            expert_max_depth: 20,
            pacing_delay_ms: 500,
            seed: None,
            weights: EvalWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Single-player against `bot`
    pub fn single_player(bot: &str) -> Self {
        Self {
            mode: GameMode::SinglePlayer,
            selected_bot: bot.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bot(mut self, bot: &str) -> Self {
        self.selected_bot = bot.to_string();
        self
    }

    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_bot_player(mut self, player: Player) -> Self {
        self.bot_player = player;
        self
    }

    pub fn with_expert_budget(mut self, ms: u64) -> Self {
        self.expert_budget_ms = ms;
        self
    }

    pub fn with_pacing(mut self, ms: u64) -> Self {
        self.pacing_delay_ms = ms;
        self
    }

    pub fn expert_budget(&self) -> Duration {
        Duration::from_millis(self.expert_budget_ms)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}
