//! # vine-cli
//!
//! Command line follower for the npm registry change feed.
//!
//! This is the entry point of the `vine` binary. It parses commands, sets up
//! logging and the async runtime, and dispatches to the command handlers.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Follow the npm registry change feed
#[derive(Parser)]
#[command(name = "vine", version, about = "Follow the npm registry change feed")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to vine.toml in this or a parent directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the change feed and print every change
    Follow {
        /// Start after this position instead of the stored checkpoint
        #[arg(long)]
        since: Option<u64>,
        /// Number of documents fetched at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Stop after this many changes
        #[arg(long)]
        limit: Option<u64>,
        /// What to do when a document cannot be resolved (fail-fast or skip)
        #[arg(long, value_name = "POLICY")]
        on_error: Option<String>,
    },
    /// Print the stored checkpoint
    Checkpoint,
    /// Forget the stored checkpoint
    Reset,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_format);
    setup_panic_handler();

    debug!("Starting vine v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", ErrorFormatter::new().format_anyhow(&e));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config)?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = ["vine", "vine_core", "vine_config", "vine_registry", "vine_follow"]
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        EnvFilter::new(directives.join(","))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("vine encountered an unexpected error: {}", panic_info);
        eprintln!("vine crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/vine-rs/vine/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
