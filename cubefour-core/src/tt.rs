//! Transposition table for the iterative-deepening search

use rustc_hash::FxHashMap;

use crate::board::BoardKey;

/// How a stored score relates to the true value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Search completed inside the window
    Exact,
    /// Fail-high: true score >= stored score
    LowerBound,
    /// Fail-low: true score <= stored score
    UpperBound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtEntry {
    /// Remaining depth the score was searched to
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
}

/// Position cache keyed by the full-board encoding, so distinct boards never
/// share an entry.
#[derive(Default)]
pub struct TranspositionTable {
    entries: FxHashMap<BoardKey, TtEntry>,
    hits: u64,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            hits: 0,
        }
    }

    /// Usable score for a node searched to `depth` with window (alpha, beta)
    pub fn probe(&mut self, key: BoardKey, depth: u32, alpha: i32, beta: i32) -> Option<i32> {
        let entry = self.entries.get(&key)?;
        if entry.depth < depth {
            return None;
        }
        let usable = match entry.bound {
            Bound::Exact => true,
            Bound::LowerBound => entry.score >= beta,
            Bound::UpperBound => entry.score <= alpha,
        };
        if usable {
            self.hits += 1;
            Some(entry.score)
        } else {
            None
        }
    }

    pub fn get(&self, key: BoardKey) -> Option<TtEntry> {
        self.entries.get(&key).copied()
    }

    /// Keep the deeper of the existing and new entry
    pub fn store(&mut self, key: BoardKey, entry: TtEntry) {
        match self.entries.get(&key) {
            Some(existing) if existing.depth > entry.depth => {}
            _ => {
                self.entries.insert(key, entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }
}
