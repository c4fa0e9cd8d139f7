#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line entry point for headless Skirmish matches.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skirmish_cli::{map_transfer, RunOptions, Scenario, Session};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless runner for Skirmish scenarios", long_about = None)]
struct Cli {
    /// Log filter directive, overriding RUST_LOG (for example `debug`)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Play a scenario and print transport messages as JSON lines
    Run(RunArgs),
    /// Print a scenario as a single-line transfer string
    Export {
        /// Path to the scenario TOML file
        #[arg(long)]
        scenario: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the scenario TOML file
    #[arg(long, required_unless_present = "layout", conflicts_with = "layout")]
    scenario: Option<PathBuf>,

    /// Transfer string produced by `export`
    #[arg(long)]
    layout: Option<String>,

    /// Number of initiative rounds to play
    #[arg(long, default_value_t = 1)]
    rounds: u32,

    /// Simulated milliseconds advanced per tick
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Seed for shuffling the initiative order
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    match cli.command {
        Mode::Run(args) => run(args),
        Mode::Export { scenario } => {
            let scenario = load_scenario(&scenario)?;
            let encoded = map_transfer::encode(&scenario).context("Failed to encode scenario")?;
            println!("{encoded}");
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let scenario = match (&args.scenario, &args.layout) {
        (Some(path), _) => load_scenario(path)?,
        (None, Some(layout)) => {
            map_transfer::decode(layout).context("Failed to decode transfer string")?
        }
        (None, None) => anyhow::bail!("either --scenario or --layout is required"),
    };

    let options = RunOptions {
        rounds: args.rounds,
        tick: Duration::from_millis(args.tick_ms),
        seed: args.seed,
    };
    let mut session = Session::new(&scenario, options)
        .with_context(|| format!("Scenario '{}' has an invalid map", scenario.session.as_str()))?;
    info!(
        session = scenario.session.as_str(),
        units = session.initiative().len(),
        "scenario loaded"
    );

    let mut messages = Vec::new();
    session.run(&mut messages);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for message in &messages {
        let line = serde_json::to_string(message).context("Failed to serialize message")?;
        writeln!(handle, "{line}").context("Failed to write to stdout")?;
    }
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario at {}", path.display()))?;
    Scenario::from_toml(&text)
        .with_context(|| format!("Failed to parse scenario at {}", path.display()))
}

fn init_tracing(directive: Option<&str>) {
    let filter = directive.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
