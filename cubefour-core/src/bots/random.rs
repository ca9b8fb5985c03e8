//! Uniform random play

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{Bot, BotId, BotInfo, Snapshot};
use crate::board::Move;

pub struct RandomBot {
    rng: ChaCha8Rng,
}

impl Default for RandomBot {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomBot {
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
}

impl Bot for RandomBot {
    fn info(&self) -> BotInfo {
        BotId::Random.info()
    }

    fn get_move(&mut self, snapshot: &Snapshot) -> Option<Move> {
        snapshot.legal_moves().choose(&mut self.rng).copied()
    }
}
