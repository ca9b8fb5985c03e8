//! Game state and the turn state machine

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord, Move, Player};
use crate::bots::Snapshot;
use crate::error::GameError;
use crate::lines::{check_winner, Line};
use crate::sync::{RoomStatus, SyncRecord, DRAW_SENTINEL};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Terminal status of a game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Ongoing,
    Won { player: Player, line: Line },
    Draw,
}

/// The most recent placement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub player: Player,
}

impl LastMove {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y, self.z)
    }
}

/// Authoritative game state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    current_player: Player,
    outcome: Outcome,
    last_move: Option<LastMove>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Player::First,
            outcome: Outcome::Ongoing,
            last_move: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn winner(&self) -> Option<Player> {
        match self.outcome {
            Outcome::Won { player, .. } => Some(player),
            _ => None,
        }
    }

    pub fn winning_line(&self) -> Option<Line> {
        match self.outcome {
            Outcome::Won { line, .. } => Some(line),
            _ => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome == Outcome::Draw
    }

    pub fn is_over(&self) -> bool {
        self.outcome != Outcome::Ongoing
    }

    pub fn last_move(&self) -> Option<LastMove> {
        self.last_move
    }

    /// Legal columns, empty once the game is over
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_over() {
            Vec::new()
        } else {
            self.board.legal_moves()
        }
    }
}

/// Derive the terminal status of a board
fn outcome_of(board: &Board) -> Outcome {
    if let Some(win) = check_winner(board) {
        Outcome::Won {
            player: win.player,
            line: win.line,
        }
    } else if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::Ongoing
    }
}

// ============================================================================
// ENGINE
// ============================================================================

type Listener = Box<dyn FnMut(&GameState) + Send>;

/// Owns the current game and is its only writer.
///
/// Every successful mutation bumps `generation`, which lets asynchronous
/// search replies detect that the position they were computed for is gone.
pub struct GameEngine {
    state: GameState,
    generation: u64,
    listeners: Vec<Listener>,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
            generation: 0,
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn current_player(&self) -> Player {
        self.state.current_player
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn move_count(&self) -> usize {
        self.state.board.piece_count()
    }

    /// Immutable copy of the position for a bot
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.state.board, self.state.current_player)
    }

    /// Called after every drop, reset and remote update
    pub fn subscribe(&mut self, listener: impl FnMut(&GameState) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Drop the current player's piece into column (x, z).
    ///
    /// Fails without touching the state if the game is over, the column is
    /// full or off the board.
    pub fn try_drop(&mut self, x: u8, z: u8) -> Result<LastMove, GameError> {
        if self.state.is_over() {
            return Err(GameError::GameOver);
        }
        let mv = Move::new(x, z).ensure_valid()?;
        let player = self.state.current_player;
        let coord = self
            .state
            .board
            .play(mv, player)
            .ok_or(GameError::ColumnFull { x, z })?;

        let last = LastMove {
            x,
            y: coord.y,
            z,
            player,
        };
        self.state.last_move = Some(last);
        self.state.outcome = outcome_of(&self.state.board);
        if self.state.outcome == Outcome::Ongoing {
            self.state.current_player = player.opponent();
        }

        self.commit();
        Ok(last)
    }

    /// Boolean form of `try_drop`
    pub fn drop_piece(&mut self, x: u8, z: u8) -> bool {
        self.try_drop(x, z).is_ok()
    }

    /// Fresh empty game; Player 0 to move
    pub fn reset_game(&mut self) {
        self.state = GameState::new();
        self.commit();
    }

    /// Record describing the current position for a remote peer
    pub fn export_record(&self) -> SyncRecord {
        let (winner, status) = match self.state.outcome {
            Outcome::Ongoing => (None, RoomStatus::Playing),
            Outcome::Won { player, .. } => (Some(player.index() as i8), RoomStatus::Finished),
            Outcome::Draw => (Some(DRAW_SENTINEL), RoomStatus::Finished),
        };
        SyncRecord {
            board: self.state.board,
            current_player: self.state.current_player,
            winner,
            winning_line: self.state.winning_line(),
            status,
        }
    }

    /// Overwrite local state with a peer's record (last writer wins).
    ///
    /// The terminal status is re-derived from the received board; a record
    /// whose declared outcome disagrees is still applied, with a warning.
    pub fn apply_remote(&mut self, record: &SyncRecord) {
        let outcome = outcome_of(&record.board);
        if !record.agrees_with(outcome) {
            tracing::warn!(
                "Remote record declares winner={:?} status={:?} but its board gives {:?}",
                record.winner,
                record.status,
                outcome
            );
        }

        let arrived = self
            .state
            .board
            .cells()
            .zip(record.board.cells())
            .find_map(|((coord, old), (_, new))| match (old, new) {
                (None, Some(player)) => Some(LastMove {
                    x: coord.x,
                    y: coord.y,
                    z: coord.z,
                    player,
                }),
                _ => None,
            });

        self.state.board = record.board;
        self.state.current_player = record.current_player;
        self.state.outcome = outcome;
        if arrived.is_some() {
            self.state.last_move = arrived;
        }

        self.commit();
    }

    fn commit(&mut self) {
        self.generation += 1;
        for listener in &mut self.listeners {
            listener(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::is_winning_line;
    use std::sync::{Arc, Mutex};

    /// A full 64-move game in which nobody completes a line
    const DRAWN_GAME: [(u8, u8); 64] = [
        (0, 0), (0, 1), (0, 0), (0, 0), (0, 1), (0, 0), (0, 3), (0, 1),
        (0, 1), (0, 2), (0, 2), (0, 2), (0, 2), (0, 3), (0, 3), (1, 0),
        (0, 3), (1, 0), (1, 0), (1, 2), (1, 0), (1, 2), (1, 1), (1, 1),
        (1, 1), (1, 1), (1, 2), (1, 2), (2, 0), (1, 3), (1, 3), (1, 3),
        (1, 3), (2, 1), (2, 0), (2, 0), (2, 0), (2, 1), (2, 1), (2, 1),
        (2, 2), (2, 2), (2, 2), (2, 3), (2, 2), (2, 3), (2, 3), (2, 3),
        (3, 1), (3, 0), (3, 0), (3, 0), (3, 0), (3, 2), (3, 1), (3, 2),
        (3, 1), (3, 1), (3, 2), (3, 3), (3, 3), (3, 2), (3, 3), (3, 3),
    ];

    fn drawn_engine() -> GameEngine {
        let mut engine = GameEngine::new();
        for (x, z) in DRAWN_GAME {
            assert!(engine.drop_piece(x, z));
        }
        engine
    }

    #[test]
    fn test_first_move() {
        let mut engine = GameEngine::new();
        let last = engine.try_drop(1, 2).unwrap();
        assert_eq!(last, LastMove { x: 1, y: 0, z: 2, player: Player::First });
        assert_eq!(engine.current_player(), Player::Second);
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.state().last_move(), Some(last));
    }

    #[test]
    fn test_full_column_rejected_without_mutation() {
        let mut engine = GameEngine::new();
        for _ in 0..4 {
            assert!(engine.drop_piece(3, 3));
        }
        let before = engine.state().clone();
        let generation = engine.generation();

        assert!(!engine.drop_piece(3, 3));
        assert!(matches!(engine.try_drop(3, 3), Err(GameError::ColumnFull { x: 3, z: 3 })));
        assert!(matches!(engine.try_drop(4, 0), Err(GameError::OutOfBounds { .. })));
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.generation(), generation);
    }

    #[test]
    fn test_win_stops_game() {
        let mut engine = GameEngine::new();
        // Player 0 stacks (0,0); Player 1 stacks (1,1)
        for _ in 0..3 {
            engine.drop_piece(0, 0);
            engine.drop_piece(1, 1);
        }
        assert!(engine.drop_piece(0, 0));

        let state = engine.state();
        assert_eq!(state.winner(), Some(Player::First));
        let line = state.winning_line().unwrap();
        assert!(is_winning_line(&line));
        assert!(line.iter().all(|&c| state.board().get(c) == Some(Player::First)));
        assert!(!state.is_draw());
        // Winner keeps the turn marker
        assert_eq!(state.current_player(), Player::First);

        let before = engine.board().encode();
        assert!(matches!(engine.try_drop(2, 2), Err(GameError::GameOver)));
        assert_eq!(engine.board().encode(), before);
        assert!(engine.state().legal_moves().is_empty());
    }

    #[test]
    fn test_draw_when_board_fills() {
        let engine = drawn_engine();
        let state = engine.state();
        assert!(state.board().is_full());
        assert!(state.is_draw());
        assert_eq!(state.winner(), None);
        assert_eq!(state.outcome(), Outcome::Draw);
    }

    #[test]
    fn test_reset() {
        let mut engine = GameEngine::new();
        engine.drop_piece(0, 0);
        engine.drop_piece(0, 1);
        engine.reset_game();
        assert_eq!(engine.state(), &GameState::new());
        assert_eq!(engine.generation(), 3);
    }

    #[test]
    fn test_subscribers_notified() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut engine = GameEngine::new();
        engine.subscribe(move |state| {
            sink.lock().unwrap().push(state.board().piece_count());
        });

        engine.drop_piece(0, 0);
        engine.drop_piece(3, 3);
        assert!(!engine.drop_piece(9, 9));
        engine.reset_game();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_remote_roundtrip() {
        let mut local = GameEngine::new();
        local.drop_piece(2, 1);

        let mut remote = GameEngine::new();
        remote.apply_remote(&local.export_record());
        remote.drop_piece(1, 1);

        let record = remote.export_record();
        assert_eq!(record.status, RoomStatus::Playing);
        local.apply_remote(&record);

        assert_eq!(local.board(), remote.board());
        assert_eq!(local.current_player(), Player::First);
        assert_eq!(
            local.state().last_move(),
            Some(LastMove { x: 1, y: 0, z: 1, player: Player::Second })
        );
    }

    #[test]
    fn test_remote_outcome_rederived() {
        let mut winner = GameEngine::new();
        for _ in 0..3 {
            winner.drop_piece(2, 2);
            winner.drop_piece(0, 3);
        }
        winner.drop_piece(2, 2);
        let mut record = winner.export_record();
        assert_eq!(record.winner, Some(0));
        assert_eq!(record.status, RoomStatus::Finished);

        // A peer that forgot to declare the win
        record.winner = None;
        record.winning_line = None;
        record.status = RoomStatus::Playing;

        let mut local = GameEngine::new();
        local.apply_remote(&record);
        assert_eq!(local.state().winner(), Some(Player::First));
        assert!(local.state().winning_line().is_some());
    }

    #[test]
    fn test_draw_record_uses_sentinel() {
        let engine = drawn_engine();
        let record = engine.export_record();
        assert_eq!(record.winner, Some(DRAW_SENTINEL));
        assert_eq!(record.status, RoomStatus::Finished);
    }
}
