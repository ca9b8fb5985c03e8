//! Analyze command - ask a bot for its move in a given position
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_position(), analyze_position(), report_analysis()
//! - Level 3: search statistics per bot tier
//! - Level 4: formatting utilities

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use cubefour_core::eval::landing;
use cubefour_core::{
    check_winner, count_threats, evaluate_board, Board, BotId, BotRegistry, EngineConfig, EvalWeights,
    ExpertBot, HardBot, Move, Player, SearchReport, Snapshot,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct AnalyzeArgs {
    /// 64 characters of '.', '0', '1' in x-major, then y, then z order
    #[arg(long)]
    pub position: String,

    /// Side to move (0 or 1)
    #[arg(long)]
    pub to_move: u8,

    /// Bot to consult
    #[arg(long, default_value = "expert")]
    pub bot: String,

    /// Expert time budget
    #[arg(long, default_value = "5000")]
    pub budget_ms: u64,

    /// Hard search depth
    #[arg(long, default_value = "5")]
    pub depth: u32,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct Analysis {
    bot: BotId,
    to_move: Player,
    best_move: Option<Move>,
    landing_y: Option<u8>,
    static_eval: i32,
    own_threats: usize,
    opponent_threats: usize,
    score: Option<i32>,
    depth: Option<u32>,
    nodes: Option<u64>,
    elapsed_ms: Option<u128>,
    timed_out: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: AnalyzeArgs, seed: Option<u64>) -> Result<()> {
    let snapshot = load_position(&args)?;
    let bot: BotId = args
        .bot
        .parse()
        .with_context(|| format!("Unknown bot '{}'", args.bot))?;

    tracing::info!("Analyzing with {} ({} to move)", bot, snapshot.current_player);

    let analysis = analyze_position(&snapshot, bot, &args, seed)?;

    report_analysis(&snapshot, &analysis, args.json);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_position(args: &AnalyzeArgs) -> Result<Snapshot> {
    let board: Board = args
        .position
        .parse()
        .context("Failed to parse --position")?;
    let player = Player::try_from(args.to_move).context("--to-move must be 0 or 1")?;

    if let Some(win) = check_winner(&board) {
        bail!("Position is already won by {}", win.player);
    }
    if board.is_full() {
        bail!("Position is a full board");
    }
    Ok(Snapshot::new(board, player))
}

fn analyze_position(snapshot: &Snapshot, bot: BotId, args: &AnalyzeArgs, seed: Option<u64>) -> Result<Analysis> {
    let report = match bot {
        BotId::Expert => Some(expert_report(snapshot, args)),
        BotId::Hard => Some(hard_report(snapshot, args)),
        BotId::Random | BotId::Greedy => None,
    };

    let best_move = match &report {
        Some(report) => report.best_move,
        None => {
            let mut config = EngineConfig::default();
            config.seed = seed;
            let mut registry = BotRegistry::new(&config);
            registry.get_mut(bot.as_str())?.get_move(snapshot)
        }
    };

    let player = snapshot.current_player;
    Ok(Analysis {
        bot,
        to_move: player,
        best_move,
        landing_y: best_move.and_then(|mv| landing(&snapshot.board, mv)).map(|c| c.y),
        static_eval: evaluate_board(&snapshot.board, player),
        own_threats: count_threats(&snapshot.board, player),
        opponent_threats: count_threats(&snapshot.board, player.opponent()),
        score: report.as_ref().map(|r| r.score),
        depth: report.as_ref().map(|r| r.depth_reached),
        nodes: report.as_ref().map(|r| r.nodes),
        elapsed_ms: report.as_ref().map(|r| r.elapsed.as_millis()),
        timed_out: report.as_ref().is_some_and(|r| r.timed_out),
    })
}

fn report_analysis(snapshot: &Snapshot, analysis: &Analysis, json: bool) {
    if json {
        if let Ok(text) = serde_json::to_string_pretty(analysis) {
            println!("{}", text);
        }
    } else {
        print_text_analysis(snapshot, analysis);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn expert_report(snapshot: &Snapshot, args: &AnalyzeArgs) -> SearchReport {
    let mut bot = ExpertBot::new(
        Duration::from_millis(args.budget_ms),
        EngineConfig::default().expert_max_depth,
        EvalWeights::default(),
    );
    bot.search(snapshot)
}

fn hard_report(snapshot: &Snapshot, args: &AnalyzeArgs) -> SearchReport {
    HardBot::new(args.depth, EvalWeights::default()).search(snapshot)
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_text_analysis(snapshot: &Snapshot, analysis: &Analysis) {
    println!("\n{}", snapshot.board);
    println!("To move:          {}", analysis.to_move);
    println!("Static eval:      {}", analysis.static_eval);
    println!(
        "Threats:          {} own, {} opponent",
        analysis.own_threats, analysis.opponent_threats
    );

    match (analysis.best_move, analysis.landing_y) {
        (Some(mv), Some(y)) => println!("{} plays:  {} landing at y={}", analysis.bot, mv, y),
        _ => println!("{} found no move", analysis.bot),
    }

    if let (Some(score), Some(depth), Some(nodes), Some(ms)) =
        (analysis.score, analysis.depth, analysis.nodes, analysis.elapsed_ms)
    {
        println!("Score:            {}", score);
        println!("Depth reached:    {}", depth);
        println!("Nodes:            {}", nodes);
        println!(
            "Elapsed:          {} ms{}",
            ms,
            if analysis.timed_out { " (budget exhausted)" } else { "" }
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn args(position: String, bot: &str) -> AnalyzeArgs {
        AnalyzeArgs {
            position,
            to_move: 0,
            bot: bot.to_string(),
            budget_ms: 200,
            depth: 3,
            json: false,
        }
    }

    #[test]
    fn test_rejects_bad_positions() {
        assert!(load_position(&args("...".into(), "hard")).is_err());
        assert!(load_position(&args("0".repeat(64), "hard")).is_err());

        let mut won = Board::new();
        for _ in 0..4 {
            won.play(Move::new(0, 0), Player::Second);
        }
        assert!(load_position(&args(won.encode(), "hard")).is_err());
    }

    #[test]
    fn test_hard_finds_win() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.play(Move::new(2, 3), Player::First);
        }
        let a = args(board.encode(), "hard");
        let snapshot = load_position(&a).unwrap();
        let analysis = analyze_position(&snapshot, BotId::Hard, &a, None).unwrap();
        assert_eq!(analysis.best_move, Some(Move::new(2, 3)));
        assert_eq!(analysis.landing_y, Some(3));
        assert_eq!(analysis.own_threats, 1);
    }

    #[test]
    fn test_greedy_has_no_search_stats() {
        let a = args(Board::new().encode(), "greedy");
        let snapshot = load_position(&a).unwrap();
        let analysis = analyze_position(&snapshot, BotId::Greedy, &a, Some(1)).unwrap();
        assert!(analysis.best_move.is_some());
        assert!(analysis.nodes.is_none());
    }
}
