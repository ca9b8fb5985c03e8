//! Bot tiers and the registry that serves them
//!
//! Every bot answers the same question: given an immutable snapshot of the
//! position, which column? Tiers differ only in how hard they look.

mod expert;
mod greedy;
mod hard;
mod random;

pub use expert::ExpertBot;
pub use greedy::GreedyBot;
pub use hard::HardBot;
pub use random::RandomBot;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Move, Player};
use crate::config::EngineConfig;
use crate::error::{GameError, Result};

// ============================================================================
// IDENTITY
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotId {
    Random,
    Greedy,
    Hard,
    Expert,
}

impl BotId {
    pub const ALL: [BotId; 4] = [BotId::Random, BotId::Greedy, BotId::Hard, BotId::Expert];

    pub fn as_str(self) -> &'static str {
        match self {
            BotId::Random => "random",
            BotId::Greedy => "greedy",
            BotId::Hard => "hard",
            BotId::Expert => "expert",
        }
    }

    /// Display metadata for the built-in tier
    pub fn info(self) -> BotInfo {
        let (name, description) = match self {
            BotId::Random => ("Random Bot", "Makes random moves. Good for beginners."),
            BotId::Greedy => ("Greedy Bot", "Looks one move ahead. A reasonable challenge."),
            BotId::Hard => ("Hard", "Thinks several moves ahead. A serious challenge."),
            BotId::Expert => ("Expert Bot", "Thinks deeply (up to 5s). Nearly unbeatable."),
        };
        BotInfo {
            id: self,
            name,
            description,
            runs_in_worker: matches!(self, BotId::Hard | BotId::Expert),
        }
    }
}

impl FromStr for BotId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        BotId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| GameError::UnknownBot(s.to_string()))
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BotInfo {
    pub id: BotId,
    pub name: &'static str,
    pub description: &'static str,
    /// Searches long enough to belong on the worker thread
    pub runs_in_worker: bool,
}

// ============================================================================
// SNAPSHOT / BOT TRAIT
// ============================================================================

/// Immutable copy of a position handed to a bot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub board: Board,
    pub current_player: Player,
}

impl Snapshot {
    pub fn new(board: Board, current_player: Player) -> Self {
        Self {
            board,
            current_player,
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.board.legal_moves()
    }

    /// Landing height in column (x, z), if it has room
    pub fn drop_position(&self, x: u8, z: u8) -> Option<u8> {
        let mv = Move::new(x, z);
        if !mv.is_valid() {
            return None;
        }
        self.board.drop_y(mv)
    }
}

pub trait Bot: Send {
    fn info(&self) -> BotInfo;

    fn id(&self) -> BotId {
        self.info().id
    }

    fn name(&self) -> &'static str {
        self.info().name
    }

    fn description(&self) -> &'static str {
        self.info().description
    }

    /// Column to play, or `None` when the position has no legal move
    fn get_move(&mut self, snapshot: &Snapshot) -> Option<Move>;
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Bots available to a session, keyed by id
#[derive(Default)]
pub struct BotRegistry {
    bots: HashMap<BotId, Box<dyn Bot>>,
}

impl BotRegistry {
    /// Registry with no bots
    pub fn empty() -> Self {
        Self::default()
    }

    /// All four tiers, configured from `config`
    pub fn new(config: &EngineConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(match config.seed {
            Some(seed) => RandomBot::with_seed(seed),
            None => RandomBot::new(),
        }));
        registry.register(Box::new(match config.seed {
            Some(seed) => GreedyBot::with_seed(seed.wrapping_add(1)),
            None => GreedyBot::new(),
        }));
        registry.register(Box::new(HardBot::new(config.hard_depth, config.weights.clone())));
        registry.register(Box::new(ExpertBot::new(
            config.expert_budget(),
            config.expert_max_depth,
            config.weights.clone(),
        )));
        registry
    }

    /// Replaces any bot already registered under the same id
    pub fn register(&mut self, bot: Box<dyn Bot>) {
        self.bots.insert(bot.id(), bot);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_ok()
    }

    pub fn info(&self, id: &str) -> Result<BotInfo> {
        let key = self.lookup(id)?;
        self.bots
            .get(&key)
            .map(|bot| bot.info())
            .ok_or_else(|| GameError::UnknownBot(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut dyn Bot> {
        let key = self.lookup(id)?;
        match self.bots.get_mut(&key) {
            Some(bot) => Ok(bot.as_mut()),
            None => Err(GameError::UnknownBot(id.to_string())),
        }
    }

    /// Registered bots in tier order
    pub fn list(&self) -> Vec<BotInfo> {
        let mut infos: Vec<BotInfo> = self.bots.values().map(|bot| bot.info()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    fn lookup(&self, id: &str) -> Result<BotId> {
        let key: BotId = id.parse()?;
        if self.bots.contains_key(&key) {
            Ok(key)
        } else {
            Err(GameError::UnknownBot(id.to_string()))
        }
    }
}
