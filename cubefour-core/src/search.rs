//! Negamax alpha-beta search used by the Hard and Expert bots
//!
//! Scores are always relative to the side to move. A position where the
//! side to move has just been beaten scores `-(WIN_SCORE + depth)`, so wins
//! found with more depth remaining (sooner) outrank later ones.

use std::cmp::Reverse;
use std::time::{Duration, Instant};

use crate::board::{Board, Coord, Move, Player, CELL_COUNT, GRID_SIZE};
use crate::eval::{heuristic_score, is_winning_drop, EvalWeights, WIN_SCORE};
use crate::lines::completes_line;
use crate::tt::{Bound, TranspositionTable, TtEntry};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Larger than any reachable score
const INFINITY: i32 = 1_000_000_000;

/// Nodes between clock checks
const POLL_MASK: u64 = 1023;

/// Ordering priorities
const ORDER_WIN: i32 = 100_000;
const ORDER_BLOCK: i32 = 50_000;
const ORDER_CENTER: i32 = 300;
const ORDER_CENTER_STEP: i32 = 50;
const ORDER_LOW: i32 = 10;

/// Iterative deepening stops starting new depths past this share of the budget
const SOFT_LIMIT_NUM: u32 = 9;
const SOFT_LIMIT_DEN: u32 = 10;

// ============================================================================
// DEADLINE / REPORT
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Result of a root search
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    /// From the mover's perspective
    pub score: i32,
    /// Deepest fully completed iteration
    pub depth_reached: u32,
    pub nodes: u64,
    pub elapsed: Duration,
    /// The clock ran out during some iteration
    pub timed_out: bool,
}

impl SearchReport {
    fn single(mv: Option<Move>, score: i32, start: Instant) -> Self {
        Self {
            best_move: mv,
            score,
            depth_reached: u32::from(mv.is_some()),
            nodes: 0,
            elapsed: start.elapsed(),
            timed_out: false,
        }
    }

    pub fn is_forced_win(&self) -> bool {
        self.score >= WIN_SCORE / 2
    }
}

// ============================================================================
// MOVE ORDERING
// ============================================================================

fn ordering_score(board: &Board, mv: Move, player: Player) -> i32 {
    let Some((next, coord)) = board.with_drop(mv, player) else {
        return -INFINITY;
    };
    if completes_line(&next, coord, player) {
        return ORDER_WIN;
    }

    let mut score = 0;
    let opponent = player.opponent();
    if let Some((blocked, _)) = board.with_drop(mv, opponent) {
        if completes_line(&blocked, coord, opponent) {
            score += ORDER_BLOCK;
        }
    }
    score += ORDER_CENTER - mv.center_distance_x2() * ORDER_CENTER_STEP;
    score += (GRID_SIZE - coord.y) as i32 * ORDER_LOW;
    score
}

/// Legal moves, most promising first: wins, blocks, central and low drops.
/// Ties keep board order.
pub fn order_moves(board: &Board, player: Player) -> Vec<Move> {
    let mut scored: Vec<(Move, i32)> = board
        .legal_moves()
        .into_iter()
        .map(|mv| (mv, ordering_score(board, mv, player)))
        .collect();
    scored.sort_by_key(|&(_, score)| Reverse(score));
    scored.into_iter().map(|(mv, _)| mv).collect()
}

// ============================================================================
// NEGAMAX WITH ALPHA-BETA
// ============================================================================

struct RootResult {
    best_move: Move,
    best_score: i32,
    /// Every root move searched before any timeout, with its score
    scored: Vec<(Move, i32)>,
}

struct Searcher<'a> {
    weights: &'a EvalWeights,
    tt: Option<&'a mut TranspositionTable>,
    deadline: Option<Deadline>,
    /// Hard cap on nodes for this searcher; exceeding it counts as a timeout
    node_limit: Option<u64>,
    nodes: u64,
    timed_out: bool,
}

impl<'a> Searcher<'a> {
    fn new(
        weights: &'a EvalWeights,
        tt: Option<&'a mut TranspositionTable>,
        deadline: Option<Deadline>,
    ) -> Self {
        Self {
            weights,
            tt,
            deadline,
            node_limit: None,
            nodes: 0,
            timed_out: false,
        }
    }

    fn poll_clock(&mut self) {
        if let Some(deadline) = self.deadline {
            if deadline.expired() {
                self.timed_out = true;
            }
        }
    }

    /// `last` is the cell the opponent of `to_move` just filled
    fn negamax(
        &mut self,
        board: &Board,
        last: Coord,
        to_move: Player,
        depth: u32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        if self.node_limit.is_some_and(|limit| self.nodes > limit) {
            self.timed_out = true;
        }
        if self.nodes & POLL_MASK == 0 {
            self.poll_clock();
        }
        if self.timed_out {
            return 0;
        }

        if completes_line(board, last, to_move.opponent()) {
            return -(WIN_SCORE + depth as i32);
        }
        if board.is_full() {
            return 0;
        }
        if depth == 0 {
            return heuristic_score(board, to_move, self.weights);
        }

        let key = board.key();
        if let Some(tt) = self.tt.as_deref_mut() {
            if let Some(score) = tt.probe(key, depth, alpha, beta) {
                return score;
            }
        }

        let alpha_orig = alpha;
        let mut best = -INFINITY;
        for mv in order_moves(board, to_move) {
            let Some((child, coord)) = board.with_drop(mv, to_move) else {
                continue;
            };
            let score = -self.negamax(&child, coord, to_move.opponent(), depth - 1, -beta, -alpha);
            if self.timed_out {
                return 0;
            }

            best = best.max(score);
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        if let Some(tt) = self.tt.as_deref_mut() {
            let bound = if best <= alpha_orig {
                Bound::UpperBound
            } else if best >= beta {
                Bound::LowerBound
            } else {
                Bound::Exact
            };
            tt.store(key, TtEntry { depth, score: best, bound });
        }

        best
    }

    /// Full-window root search over `moves` in the given order
    fn search_root(&mut self, board: &Board, player: Player, moves: &[Move], depth: u32) -> Option<RootResult> {
        let mut result: Option<RootResult> = None;
        let mut alpha = -INFINITY;

        for &mv in moves {
            if depth > 1 {
                self.poll_clock();
            }
            if self.timed_out {
                break;
            }
            let Some((child, coord)) = board.with_drop(mv, player) else {
                continue;
            };
            let score = -self.negamax(&child, coord, player.opponent(), depth - 1, -INFINITY, -alpha);
            if self.timed_out {
                break;
            }
            alpha = alpha.max(score);

            let entry = result.get_or_insert(RootResult {
                best_move: mv,
                best_score: score,
                scored: Vec::with_capacity(moves.len()),
            });
            if score > entry.best_score {
                entry.best_score = score;
                entry.best_move = mv;
            }
            entry.scored.push((mv, score));
        }

        result
    }
}

// ============================================================================
// ROOT DRIVERS
// ============================================================================

/// Trivial roots: no move, a forced move, or an immediate win
fn shortcut(board: &Board, player: Player, moves: &[Move], start: Instant) -> Option<SearchReport> {
    match moves {
        [] => Some(SearchReport::single(None, 0, start)),
        [only] => Some(SearchReport::single(Some(*only), 0, start)),
        _ => moves
            .iter()
            .find(|&&mv| is_winning_drop(board, mv, player))
            .map(|&mv| SearchReport::single(Some(mv), WIN_SCORE, start)),
    }
}

/// Fixed-depth search with no clock
pub fn search_fixed_depth(board: &Board, player: Player, depth: u32, weights: &EvalWeights) -> SearchReport {
    let start = Instant::now();
    let moves = order_moves(board, player);
    if let Some(report) = shortcut(board, player, &moves, start) {
        return report;
    }

    let depth = depth.max(1);
    let mut searcher = Searcher::new(weights, None, None);
    let root = searcher.search_root(board, player, &moves, depth);

    SearchReport {
        best_move: root.as_ref().map(|r| r.best_move).or(moves.first().copied()),
        score: root.as_ref().map_or(0, |r| r.best_score),
        depth_reached: depth,
        nodes: searcher.nodes,
        elapsed: start.elapsed(),
        timed_out: false,
    }
}

/// Iterative deepening under a soft time budget.
///
/// Each completed iteration reorders the root by its scores. An iteration the
/// clock interrupts is thrown away and the previous one stands.
pub fn search_iterative(
    board: &Board,
    player: Player,
    budget: Duration,
    max_depth: u32,
    weights: &EvalWeights,
    tt: &mut TranspositionTable,
) -> SearchReport {
    let limits = Limits {
        budget,
        max_depth,
        max_nodes: None,
    };
    iterate(board, player, limits, weights, tt)
}

#[derive(Clone, Copy, Debug)]
struct Limits {
    budget: Duration,
    max_depth: u32,
    /// Total across all iterations
    max_nodes: Option<u64>,
}

fn iterate(
    board: &Board,
    player: Player,
    limits: Limits,
    weights: &EvalWeights,
    tt: &mut TranspositionTable,
) -> SearchReport {
    let Limits {
        budget, max_depth, ..
    } = limits;
    let start = Instant::now();
    let mut ordered = order_moves(board, player);
    if let Some(report) = shortcut(board, player, &ordered, start) {
        return report;
    }

    let deadline = Deadline::after(budget);
    let soft_limit = budget * SOFT_LIMIT_NUM / SOFT_LIMIT_DEN;
    let empties = (CELL_COUNT - board.piece_count()) as u32;
    let max_depth = max_depth.min(empties).max(1);

    let mut report = SearchReport {
        best_move: ordered.first().copied(),
        score: 0,
        depth_reached: 0,
        nodes: 0,
        elapsed: Duration::ZERO,
        timed_out: false,
    };

    for depth in 1..=max_depth {
        if depth > 1 && start.elapsed() >= soft_limit {
            break;
        }

        let mut searcher = Searcher::new(weights, Some(&mut *tt), Some(deadline));
        searcher.node_limit = limits.max_nodes.map(|max| max.saturating_sub(report.nodes));
        let root = searcher.search_root(board, player, &ordered, depth);
        report.nodes += searcher.nodes;
        if searcher.timed_out {
            report.timed_out = true;
            break;
        }
        let Some(root) = root else { break };

        report.best_move = Some(root.best_move);
        report.score = root.best_score;
        report.depth_reached = depth;

        let mut scored = root.scored;
        scored.sort_by_key(|&(_, score)| Reverse(score));
        ordered = scored.into_iter().map(|(mv, _)| mv).collect();

        tracing::trace!(
            "depth {} best {} score {} nodes {}",
            depth,
            root.best_move,
            root.best_score,
            report.nodes
        );

        if report.is_forced_win() {
            break;
        }
    }

    report.elapsed = start.elapsed();
    report
}

// ============================================================================
// TESTS
// ============================================================================
