//! One-ply greedy play

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{Bot, BotId, BotInfo, Snapshot};
use crate::board::{Board, Move, Player, GRID_SIZE};
use crate::eval::count_threats;
use crate::lines::completes_line;

// ============================================================================
// WEIGHTS
// ============================================================================

const WIN: f64 = 10_000.0;
const BLOCK: f64 = 5_000.0;
const OWN_THREAT: f64 = 100.0;
const OPPONENT_THREAT: f64 = 50.0;
const CENTER: f64 = 10.0;
const LOW: f64 = 5.0;
/// Upper bound of the tie-breaking noise
const JITTER: f64 = 2.0;

pub struct GreedyBot {
    rng: ChaCha8Rng,
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self::new()
    }
}

impl GreedyBot {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// `None` for a full column
    fn score_move(&mut self, board: &Board, mv: Move, player: Player) -> Option<f64> {
        let (next, coord) = board.with_drop(mv, player)?;
        if completes_line(&next, coord, player) {
            return Some(WIN);
        }

        let opponent = player.opponent();
        let mut score = 0.0;
        if let Some((blocked, _)) = board.with_drop(mv, opponent) {
            if completes_line(&blocked, coord, opponent) {
                score += BLOCK;
            }
        }

        score += count_threats(&next, player) as f64 * OWN_THREAT;
        score -= count_threats(&next, opponent) as f64 * OPPONENT_THREAT;

        // Manhattan distance from the grid centre, 1.0 to 3.0
        let center_distance = mv.center_distance_x2() as f64 / 2.0;
        score += (3.0 - center_distance) * CENTER;
        score += (GRID_SIZE - coord.y) as f64 * LOW;

        score += self.rng.gen::<f64>() * JITTER;
        Some(score)
    }
}

impl Bot for GreedyBot {
    fn info(&self) -> BotInfo {
        BotId::Greedy.info()
    }

    fn get_move(&mut self, snapshot: &Snapshot) -> Option<Move> {
        let board = &snapshot.board;
        let player = snapshot.current_player;

        let mut best: Option<(Move, f64)> = None;
        for mv in board.legal_moves() {
            let Some(score) = self.score_move(board, mv, player) else {
                continue;
            };
            if score >= WIN {
                return Some(mv);
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
        }
        best.map(|(mv, _)| mv)
    }
}
