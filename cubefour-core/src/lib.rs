//! CubeFour Core - Game engine and bots
//!
//! This crate provides the core logic for gravity connect-four on a 4x4x4 cube:
//! - Board model with gravity drops and the 76 winning lines
//! - Turn state machine with win and draw detection
//! - Position evaluation and alpha-beta search
//! - Four bot tiers behind a registry
//! - A worker-thread scheduler that discards stale results
//! - Session driver, configuration and network sync records

pub mod board;
pub mod bots;
pub mod config;
pub mod error;
pub mod eval;
pub mod game;
pub mod lines;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod sync;
pub mod tt;

// Re-exports for convenient access
pub use board::{Board, BoardKey, Cell, Coord, Move, Player, CELL_COUNT, GRID_SIZE};
pub use bots::{Bot, BotId, BotInfo, BotRegistry, ExpertBot, GreedyBot, HardBot, RandomBot, Snapshot};
pub use config::{EngineConfig, GameMode};
pub use error::{GameError, Result};
pub use eval::{count_threats, evaluate_board, evaluate_with, EvalWeights, WIN_SCORE};
pub use game::{GameEngine, GameState, LastMove, Outcome};
pub use lines::{check_winner, completes_line, is_winning_line, Line, Win, WINNING_LINES};
pub use scheduler::{SearchEvent, SearchScheduler, WorkerRequest, WorkerResponse};
pub use search::{order_moves, search_fixed_depth, search_iterative, SearchReport};
pub use session::GameSession;
pub use sync::{RoomStatus, SyncRecord, DRAW_SENTINEL};
pub use tt::{Bound, TranspositionTable, TtEntry};
