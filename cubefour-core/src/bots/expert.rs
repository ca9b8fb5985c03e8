//! Time-bounded iterative deepening

use std::time::Duration;

use super::{Bot, BotId, BotInfo, Snapshot};
use crate::board::Move;
use crate::eval::EvalWeights;
use crate::search::{search_iterative, SearchReport};
use crate::tt::TranspositionTable;

pub const DEFAULT_BUDGET: Duration = Duration::from_millis(5000);
pub const DEFAULT_MAX_DEPTH: u32 = 20;

pub struct ExpertBot {
    pub budget: Duration,
    pub max_depth: u32,
    pub weights: EvalWeights,
    tt: TranspositionTable,
}

impl Default for ExpertBot {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET, DEFAULT_MAX_DEPTH, EvalWeights::default())
    }
}

impl ExpertBot {
    pub fn new(budget: Duration, max_depth: u32, weights: EvalWeights) -> Self {
        Self {
            budget,
            max_depth,
            weights,
            tt: TranspositionTable::with_capacity(1 << 16),
        }
    }

    /// Search `snapshot` with a fresh table and report the statistics
    pub fn search(&mut self, snapshot: &Snapshot) -> SearchReport {
        self.tt.clear();
        let report = search_iterative(
            &snapshot.board,
            snapshot.current_player,
            self.budget,
            self.max_depth,
            &self.weights,
            &mut self.tt,
        );
        tracing::debug!(
            "Expert search: depth {} nodes {} tt {} elapsed {:?}{}",
            report.depth_reached,
            report.nodes,
            self.tt.len(),
            report.elapsed,
            if report.timed_out { " (timed out)" } else { "" }
        );
        report
    }
}

impl Bot for ExpertBot {
    fn info(&self) -> BotInfo {
        BotId::Expert.info()
    }

    fn get_move(&mut self, snapshot: &Snapshot) -> Option<Move> {
        self.search(snapshot).best_move
    }
}
