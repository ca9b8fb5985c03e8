//! Play command - a game in the terminal
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), game_loop()
//! - Level 3: bot_turn(), human_turn()
//! - Level 4: parse_command(), rendering

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use cubefour_core::{BotId, EngineConfig, GameMode, GameSession, GameState, Outcome, Player};

/// How long one wait on the bot lasts before the loop checks in again
const BOT_POLL: Duration = Duration::from_secs(1);

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Bot to play against (random, greedy, hard, expert)
    #[arg(long)]
    pub bot: Option<String>,

    /// Your side; 0 moves first
    #[arg(long, default_value = "0")]
    pub human: u8,

    /// Hot-seat game with no bot
    #[arg(long)]
    pub two_player: bool,

    /// Engine configuration JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Drop(u8, u8),
    Reset,
    Quit,
    Help,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let config = build_config(&args, seed)?;

    match config.mode {
        GameMode::SinglePlayer => tracing::info!(
            "Starting game against {} (bot plays {})",
            config.selected_bot,
            config.bot_player
        ),
        _ => tracing::info!("Starting two-player game"),
    }

    let mut session = GameSession::new(config).context("Failed to start game session")?;
    game_loop(&mut session)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_config(args: &PlayArgs, seed: Option<u64>) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(bot) = &args.bot {
        bot.parse::<BotId>()
            .with_context(|| format!("Unknown bot '{}'", bot))?;
        config = config.with_bot(bot);
    }

    if args.two_player {
        return Ok(config.with_mode(GameMode::TwoPlayer));
    }
    let human = Player::try_from(args.human).context("--human must be 0 or 1")?;
    Ok(config
        .with_mode(GameMode::SinglePlayer)
        .with_bot_player(human.opponent()))
}

fn game_loop(session: &mut GameSession) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    print_help();

    loop {
        render(session.state());

        if session.is_bot_turn() {
            bot_turn(session)?;
            continue;
        }

        print!("{}> ", prompt(session.state()));
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;

        match parse_command(&line) {
            Some(Command::Quit) => break,
            Some(Command::Reset) => session.reset(),
            Some(Command::Help) | None => print_help(),
            Some(Command::Drop(x, z)) => human_turn(session, x, z),
        }
    }

    Ok(())
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn bot_turn(session: &mut GameSession) -> Result<()> {
    if !session.is_bot_thinking() {
        println!("{} is thinking...", session.config().selected_bot);
    }
    loop {
        match session.wait_for_bot(BOT_POLL)? {
            Some(mv) => {
                println!("Bot plays {}", mv);
                return Ok(());
            }
            None if !session.is_bot_turn() => return Ok(()),
            None => {}
        }
    }
}

fn human_turn(session: &mut GameSession, x: u8, z: u8) {
    if session.state().is_over() {
        println!("Game over. Type 'reset' for a new game.");
    } else if !session.play(x, z) {
        println!("Can't drop into column ({}, {})", x, z);
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// `x z`, `reset`, `quit` or `help`
fn parse_command(line: &str) -> Option<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["q" | "quit" | "exit"] => Some(Command::Quit),
        ["r" | "reset"] => Some(Command::Reset),
        ["h" | "help" | "?"] => Some(Command::Help),
        [x, z] => Some(Command::Drop(x.parse().ok()?, z.parse().ok()?)),
        _ => None,
    }
}

fn prompt(state: &GameState) -> String {
    if state.is_over() {
        "(game over)".to_string()
    } else {
        format!("{}", state.current_player())
    }
}

fn render(state: &GameState) {
    println!("\n{}", state.board());
    if let Some(last) = state.last_move() {
        println!("Last move: {} at ({}, {}, {})", last.player, last.x, last.y, last.z);
    }
    match state.outcome() {
        Outcome::Won { player, line } => {
            let cells: Vec<String> = line
                .iter()
                .map(|c| format!("({}, {}, {})", c.x, c.y, c.z))
                .collect();
            println!("{} wins along {}", player, cells.join(" "));
        }
        Outcome::Draw => println!("Draw: the cube is full"),
        Outcome::Ongoing => {}
    }
}

fn print_help() {
    println!("Enter a column as 'x z' (0-3 each), 'reset' for a new game or 'quit'.");
}

// ============================================================================
// TESTS
// ============================================================================
