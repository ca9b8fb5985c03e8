//! Integration tests for the CubeFour engine
//!
//! Tests the full stack: board and win detection, the turn state machine,
//! evaluation, every bot tier and the search scheduler.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use cubefour_core::{
    check_winner, evaluate_board, is_winning_line, Board, Bot, BotId, Coord, EngineConfig, EvalWeights, ExpertBot,
    GameEngine, GameError, GameMode, GameSession, GreedyBot, HardBot, Move, Outcome, Player, RandomBot,
    SearchEvent, SearchScheduler, Snapshot, SyncRecord, WINNING_LINES,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

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

/// `player` stacked three high in column (0, 0)
fn three_stacked(player: Player) -> Board {
    let mut board = Board::new();
    for _ in 0..3 {
        board.play(Move::new(0, 0), player);
    }
    board
}

/// Random legal play until the game ends or `limit` pieces are down
fn random_game(rng: &mut ChaCha8Rng, limit: usize) -> GameEngine {
    let mut engine = GameEngine::new();
    while !engine.state().is_over() && engine.move_count() < limit {
        let moves = engine.state().legal_moves();
        let mv = *moves.choose(rng).unwrap();
        assert!(engine.drop_piece(mv.x, mv.z));
    }
    engine
}

fn owns_some_line(board: &Board) -> bool {
    WINNING_LINES.iter().any(|line| {
        let first = board.get(line[0]);
        first.is_some() && line.iter().all(|&c| board.get(c) == first)
    })
}

// ============================================================================
// BOARD AND GAME ENGINE
// ============================================================================

#[test]
fn test_winner_iff_line_owned() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for n in 0..300 {
        let engine = random_game(&mut rng, n % 65);
        let board = engine.state().board();
        assert_eq!(check_winner(board).is_some(), owns_some_line(board), "{}", board.encode());
    }
}

#[test]
fn test_failed_drop_leaves_state_unchanged() {
    let mut engine = GameEngine::new();
    for _ in 0..4 {
        assert!(engine.drop_piece(2, 2));
    }
    let before = engine.state().clone();
    let generation = engine.generation();

    assert!(!engine.drop_piece(2, 2));
    assert!(!engine.drop_piece(4, 0));
    assert!(!engine.drop_piece(0, 9));
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.generation(), generation);
}

#[test]
fn test_winning_line_is_valid_and_owned() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut wins = 0;
    for _ in 0..100 {
        let engine = random_game(&mut rng, 64);
        let state = engine.state();
        if let Outcome::Won { player, line } = state.outcome() {
            wins += 1;
            assert!(is_winning_line(&line));
            assert!(line.iter().all(|&c| state.board().get(c) == Some(player)));
            assert_eq!(state.winner(), Some(player));
            assert!(!state.is_draw());
            // The winner made the last move and keeps the turn
            assert_eq!(state.last_move().map(|m| m.player), Some(player));
            assert_eq!(state.current_player(), player);
        }
    }
    assert!(wins > 50);
}

#[test]
fn test_full_board_without_line_is_draw() {
    let mut engine = GameEngine::new();
    for (i, (x, z)) in DRAWN_GAME.into_iter().enumerate() {
        assert!(!engine.state().is_over(), "ended early at move {}", i);
        assert!(engine.drop_piece(x, z));
    }
    let state = engine.state();
    assert!(state.is_draw());
    assert_eq!(state.winner(), None);
    assert_eq!(state.winning_line(), None);
    assert!(state.board().is_full());
    assert!(!engine.drop_piece(0, 0));
}

#[test]
fn test_reset_starts_fresh() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut engine = random_game(&mut rng, 20);
    engine.reset_game();
    let state = engine.state();
    assert!(state.board().is_empty());
    assert_eq!(state.current_player(), Player::First);
    assert_eq!(state.outcome(), Outcome::Ongoing);
    assert_eq!(state.last_move(), None);
}

#[test]
fn test_sync_record_round_trip_between_engines() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let source = random_game(&mut rng, 64);
    let json = source.export_record().to_json().unwrap();

    let mut mirror = GameEngine::new();
    mirror.apply_remote(&SyncRecord::from_json(&json).unwrap());
    assert_eq!(mirror.state().board(), source.state().board());
    assert_eq!(mirror.state().outcome(), source.state().outcome());
    assert_eq!(mirror.current_player(), source.current_player());
}

// ============================================================================
// EVALUATION AND HASHING
// ============================================================================

#[test]
fn test_evaluation_antisymmetric() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for n in 0..200 {
        let engine = random_game(&mut rng, n % 50);
        let board = engine.state().board();
        if engine.state().is_over() {
            continue;
        }
        assert_eq!(
            evaluate_board(board, Player::First),
            -evaluate_board(board, Player::Second)
        );
    }
}

#[test]
fn test_board_key_injective() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut seen: HashMap<u128, Board> = HashMap::new();
    for n in 0..2000 {
        let engine = random_game(&mut rng, n % 64);
        let board = *engine.state().board();
        if let Some(previous) = seen.insert(board.key().0, board) {
            assert_eq!(previous, board, "two boards share key {:#x}", board.key().0);
        }
    }

    // Single-cell differences always change the key
    let base = Board::new().key();
    for i in 0..64 {
        let coord = Coord::from_index(i);
        let mut board = Board::new();
        for _ in 0..=coord.y {
            board.play(Move::new(coord.x, coord.z), Player::First);
        }
        let mut other = Board::new();
        for y in 0..=coord.y {
            let player = if y == coord.y { Player::Second } else { Player::First };
            other.play(Move::new(coord.x, coord.z), player);
        }
        assert_ne!(board.key(), other.key());
        assert_ne!(board.key(), base);
    }
}

// ============================================================================
// BOTS
// ============================================================================

#[test]
fn test_random_bot_always_legal() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut bot = RandomBot::with_seed(21);
    for n in 0..100 {
        let engine = random_game(&mut rng, n % 64);
        if engine.state().is_over() {
            continue;
        }
        let snapshot = engine.snapshot();
        let mv = bot.get_move(&snapshot).unwrap();
        assert!(snapshot.legal_moves().contains(&mv));
        assert!(snapshot.drop_position(mv.x, mv.z).is_some());
    }
}

#[test]
fn test_every_tier_takes_the_win() {
    let snapshot = Snapshot::new(three_stacked(Player::First), Player::First);
    let mut bots: Vec<Box<dyn Bot>> = vec![
        Box::new(GreedyBot::with_seed(1)),
        Box::new(HardBot::default()),
        Box::new(ExpertBot::default()),
    ];
    for bot in &mut bots {
        assert_eq!(bot.get_move(&snapshot), Some(Move::new(0, 0)), "{} missed the win", bot.name());
    }
}

#[test]
fn test_search_tiers_block() {
    let snapshot = Snapshot::new(three_stacked(Player::Second), Player::First);
    let mut hard = HardBot::default();
    assert_eq!(hard.get_move(&snapshot), Some(Move::new(0, 0)));

    let mut expert = ExpertBot::new(Duration::from_millis(1000), 20, EvalWeights::default());
    assert_eq!(expert.get_move(&snapshot), Some(Move::new(0, 0)));
}

#[test]
fn test_expert_respects_budget_on_empty_board() {
    let mut expert = ExpertBot::default();
    let snapshot = Snapshot::new(Board::new(), Player::First);

    let start = Instant::now();
    let report = expert.search(&snapshot);
    let elapsed = start.elapsed();

    assert!(elapsed <= Duration::from_millis(6000), "took {:?}", elapsed);
    let mv = report.best_move.unwrap();
    assert!(snapshot.legal_moves().contains(&mv));
    assert!(report.depth_reached >= 1);
}

#[test]
fn test_bots_finish_a_game() {
    let mut first = GreedyBot::with_seed(4);
    let mut second = HardBot::new(2, EvalWeights::default());
    let mut engine = GameEngine::new();
    while !engine.state().is_over() {
        let snapshot = engine.snapshot();
        let mv = match engine.current_player() {
            Player::First => first.get_move(&snapshot),
            Player::Second => second.get_move(&snapshot),
        }
        .unwrap();
        engine.try_drop(mv.x, mv.z).unwrap();
    }
    assert!(engine.state().winner().is_some() || engine.state().is_draw());
}

// ============================================================================
// SCHEDULER AND SESSION
// ============================================================================

#[test]
fn test_stale_reply_never_applied() {
    let config = EngineConfig::single_player("hard").with_pacing(0);
    let mut scheduler = SearchScheduler::new(&EngineConfig {
        hard_depth: 3,
        ..config
    })
    .unwrap();
    let mut engine = GameEngine::new();

    scheduler.request(&engine, BotId::Hard.as_str()).unwrap();
    engine.reset_game();
    let event = scheduler.wait(&engine, Duration::from_secs(30)).unwrap();
    assert!(matches!(event, SearchEvent::Discarded { .. }));
    assert!(engine.state().board().is_empty());
}

#[test]
fn test_session_plays_single_player_game() {
    let config = EngineConfig::single_player("greedy").with_seed(12).with_pacing(0);
    let mut session = GameSession::new(config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(12);

    while !session.state().is_over() {
        if session.is_bot_turn() {
            session.wait_for_bot(Duration::from_secs(5)).unwrap();
        } else {
            let moves = session.state().legal_moves();
            let mv = *moves.choose(&mut rng).unwrap();
            assert!(session.play(mv.x, mv.z));
        }
    }
    assert!(!session.is_bot_turn());
}

#[test]
fn test_session_unknown_bot_does_not_advance() {
    let config = EngineConfig::single_player("oracle").with_pacing(0);
    let mut session = GameSession::new(config).unwrap();
    session.set_mode(GameMode::SinglePlayer);
    assert!(session.play(0, 0));
    assert!(matches!(
        session.wait_for_bot(Duration::from_millis(50)),
        Err(GameError::UnknownBot(_))
    ));
    assert_eq!(session.engine().move_count(), 1);
}
