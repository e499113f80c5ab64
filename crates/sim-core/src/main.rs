//! Headless Simulation Runner
//!
//! The reporting-side collaborator for the engine: loads a TOML
//! configuration, drives the run, and writes the collected metrics history
//! as JSON for downstream analysis.
//!
//! Run with: cargo run --bin adapt_sim
//!
//! Examples:
//!   cargo run --bin adapt_sim -- --ticks 200 --seed 7
//!   cargo run --bin adapt_sim -- --config sim.toml --events-out output/events.jsonl

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use sim_core::config::SimConfig;
use sim_core::engine::Engine;
use sim_core::events::EventLogger;

/// Headless runner for the adaptive learning simulation
#[derive(Parser, Debug)]
#[command(name = "adapt_sim")]
#[command(about = "Run the social-learning / dilemma simulation without a UI")]
struct Args {
    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate (overrides the config run length)
    #[arg(long)]
    ticks: Option<u64>,

    /// Random seed override
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the metrics history
    #[arg(long, default_value = "output/metrics.json")]
    stats_out: PathBuf,

    /// Optional JSONL event log
    #[arg(long)]
    events_out: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.ticks = Some(ticks);
    }
    let ticks = config.ticks.unwrap_or(50);
    config.ticks = Some(ticks);

    let events = match &args.events_out {
        Some(path) => EventLogger::new(path)?,
        None => EventLogger::null(),
    };

    let mut engine = Engine::initialize_with_logger(config, events)?;
    engine.run(ticks);

    engine.history().write_json(&args.stats_out)?;
    info!(
        "simulation complete: {} ticks, metrics written to {}",
        ticks,
        args.stats_out.display()
    );
    Ok(())
}
