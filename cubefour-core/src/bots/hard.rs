//! Fixed-depth alpha-beta

use super::{Bot, BotId, BotInfo, Snapshot};
use crate::board::Move;
use crate::eval::EvalWeights;
use crate::search::{search_fixed_depth, SearchReport};

pub const DEFAULT_DEPTH: u32 = 5;

pub struct HardBot {
    pub depth: u32,
    pub weights: EvalWeights,
}

impl Default for HardBot {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH, EvalWeights::default())
    }
}

impl HardBot {
    pub fn new(depth: u32, weights: EvalWeights) -> Self {
        Self { depth, weights }
    }

    pub fn search(&self, snapshot: &Snapshot) -> SearchReport {
        search_fixed_depth(&snapshot.board, snapshot.current_player, self.depth, &self.weights)
    }
}

impl Bot for HardBot {
    fn info(&self) -> BotInfo {
        BotId::Hard.info()
    }

    fn get_move(&mut self, snapshot: &Snapshot) -> Option<Move> {
        self.search(snapshot).best_move
    }
}
