//! CubeFour CLI - Command-line interface
//!
//! Commands:
//! - play: Play in the terminal against a bot or hot-seat
//! - match: Pit two bots against each other over a series of games
//! - analyze: Ask a bot for its move in a given position

mod analyze;
mod match_cmd;
mod play;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubefour")]
#[command(about = "Gravity connect-four on a 4x4x4 cube")]
struct Cli {
    /// Random seed for reproducibility
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a game in the terminal
    Play(play::PlayArgs),
    /// Play a series of bot-vs-bot games
    Match(match_cmd::MatchArgs),
    /// Run a bot on an encoded position
    Analyze(analyze::AnalyzeArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Play(args) => play::run(args, cli.seed),
        Commands::Match(args) => match_cmd::run(args, cli.seed),
        Commands::Analyze(args) => analyze::run(args, cli.seed),
    }
}
