//! Match command - play a series of games between two bots
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: parse_bots(), play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: formatting utilities

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use cubefour_core::{BotId, BotRegistry, EngineConfig, GameEngine, Player};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// Bot that moves first in odd-numbered games
    #[arg(long)]
    pub first: String,

    /// Bot that moves first in even-numbered games
    #[arg(long)]
    pub second: String,

    /// Number of games to play (will alternate colors)
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Play games in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Expert time budget per move
    #[arg(long, default_value = "1000")]
    pub expert_budget_ms: u64,

    /// Hard search depth
    #[arg(long, default_value = "5")]
    pub hard_depth: u32,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    /// Seat held by `--first`
    first_seat: Player,
    winner: Option<Player>,
    moves: usize,
}

impl GameRecord {
    fn first_won(&self) -> bool {
        self.winner == Some(self.first_seat)
    }

    fn second_won(&self) -> bool {
        self.winner == Some(self.first_seat.opponent())
    }
}

/// Aggregated match results
#[derive(Clone, Debug)]
struct MatchResults {
    first: BotId,
    second: BotId,
    games: Vec<GameRecord>,
    first_wins: usize,
    second_wins: usize,
    draws: usize,
    avg_moves: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    let (first, second) = parse_bots(&args)?;

    tracing::info!(
        "Starting match: {} vs {} ({} games{})",
        first,
        second,
        args.games,
        if args.parallel { ", parallel" } else { "" }
    );

    let results = play_match(first, second, &args, seed)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn parse_bots(args: &MatchArgs) -> Result<(BotId, BotId)> {
    let first = args
        .first
        .parse()
        .with_context(|| format!("Unknown bot for --first: {}", args.first))?;
    let second = args
        .second
        .parse()
        .with_context(|| format!("Unknown bot for --second: {}", args.second))?;
    Ok((first, second))
}

fn play_match(first: BotId, second: BotId, args: &MatchArgs, seed: Option<u64>) -> Result<MatchResults> {
    let base_seed = seed.unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
    let config = EngineConfig::default()
        .with_expert_budget(args.expert_budget_ms)
        .with_pacing(0);
    let config = EngineConfig {
        hard_depth: args.hard_depth,
        ..config
    };

    let progress = ProgressBar::new(args.games as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} games [{elapsed_precise}]")
            .context("Invalid progress template")?,
    );

    let play = |game_index: usize| -> Result<GameRecord> {
        let game_config = config.clone().with_seed(base_seed.wrapping_add(game_index as u64));
        let record = play_single_game(first, second, game_index, &game_config)?;
        tracing::debug!(
            "Game {}: winner {:?} in {} moves",
            record.game_number,
            record.winner,
            record.moves
        );
        progress.inc(1);
        Ok(record)
    };

    let games = if args.parallel {
        (0..args.games).into_par_iter().map(play).collect::<Result<Vec<_>>>()?
    } else {
        (0..args.games).map(play).collect::<Result<Vec<_>>>()?
    };
    progress.finish_and_clear();

    Ok(compute_match_statistics(first, second, games))
}

fn report_results(results: &MatchResults, args: &MatchArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game to completion; `--first` moves first in even game indices
fn play_single_game(first: BotId, second: BotId, game_index: usize, config: &EngineConfig) -> Result<GameRecord> {
    let swap_colors = game_index % 2 == 1;
    let (seats, first_seat) = if swap_colors {
        ([second, first], Player::Second)
    } else {
        ([first, second], Player::First)
    };

    // One registry per seat so a mirror match keeps separate state
    let mut registries = [BotRegistry::new(config), BotRegistry::new(config)];
    let mut engine = GameEngine::new();

    while !engine.state().is_over() {
        let seat = engine.current_player().index() as usize;
        let bot = registries[seat].get_mut(seats[seat].as_str())?;
        let mv = bot
            .get_move(&engine.snapshot())
            .with_context(|| format!("{} returned no move", seats[seat]))?;
        engine
            .try_drop(mv.x, mv.z)
            .with_context(|| format!("{} chose illegal move {}", seats[seat], mv))?;
    }

    Ok(GameRecord {
        game_number: game_index + 1,
        first_seat,
        winner: engine.state().winner(),
        moves: engine.move_count(),
    })
}

fn compute_match_statistics(first: BotId, second: BotId, games: Vec<GameRecord>) -> MatchResults {
    let first_wins = games.iter().filter(|g| g.first_won()).count();
    let second_wins = games.iter().filter(|g| g.second_won()).count();
    let draws = games.iter().filter(|g| g.winner.is_none()).count();

    let total_moves: usize = games.iter().map(|g| g.moves).sum();
    let avg_moves = if games.is_empty() {
        0.0
    } else {
        total_moves as f32 / games.len() as f32
    };

    MatchResults {
        first,
        second,
        games,
        first_wins,
        second_wins,
        draws,
        avg_moves,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

fn winner_label(results: &MatchResults, game: &GameRecord) -> String {
    if game.first_won() {
        results.first.to_string()
    } else if game.second_won() {
        results.second.to_string()
    } else {
        "draw".to_string()
    }
}

fn print_json_results(results: &MatchResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        moved_first: BotId,
        winner: String,
        moves: usize,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        first: BotId,
        second: BotId,
        total_games: usize,
        first_wins: usize,
        second_wins: usize,
        draws: usize,
        avg_moves: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        first: results.first,
        second: results.second,
        total_games: results.games.len(),
        first_wins: results.first_wins,
        second_wins: results.second_wins,
        draws: results.draws,
        avg_moves: results.avg_moves,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                moved_first: if g.first_seat == Player::First {
                    results.first
                } else {
                    results.second
                },
                winner: winner_label(results, g),
                moves: g.moves,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

fn print_text_results(results: &MatchResults) {
    let total = results.games.len();

    println!("\n=== Match Results: {} vs {} ===", results.first, results.second);
    println!("Total games: {}", total);
    println!(
        "{:<7} wins: {} ({:.1}%)",
        results.first,
        results.first_wins,
        percent(results.first_wins, total)
    );
    println!(
        "{:<7} wins: {} ({:.1}%)",
        results.second,
        results.second_wins,
        percent(results.second_wins, total)
    );
    println!("Draws:        {} ({:.1}%)", results.draws, percent(results.draws, total));
    println!("Avg moves:    {:.1}", results.avg_moves);

    println!("\nGame details:");
    for game in &results.games {
        println!(
            "  Game {}: {} in {} moves",
            game.game_number,
            winner_label(results, game),
            game.moves
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
