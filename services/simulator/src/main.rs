//! HashSwap Simulator
//!
//! Deploys an exchange in-process from the layered configuration, plays a
//! trading scenario against it and prints the resulting pool and mining
//! state as JSON on stdout. Logs go to stderr.

mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use dex_config::{load_config, LoggingConfig};
use scenario::{Scenario, ScenarioSettings};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "dex_simulator")]
#[command(about = "Run a trading and mining scenario against a simulated HashSwap deployment")]
struct Args {
    /// Configuration file path; defaults and environment apply without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of trading accounts
    #[arg(long, default_value_t = 3)]
    traders: usize,

    /// Trading rounds, one swap per trader each
    #[arg(long, default_value_t = 20)]
    rounds: u64,

    /// Base trade size in whole tokens
    #[arg(long, default_value_t = 1_000)]
    trade_size: u64,

    /// Seed liquidity per side in whole tokens
    #[arg(long, default_value_t = 1_000_000)]
    liquidity: u64,

    /// Empty blocks mined before harvesting
    #[arg(long, default_value_t = 10)]
    idle_blocks: u64,

    /// Emit logs as JSON regardless of the configured format
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(logging: &LoggingConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json || logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging, args.json_logs);

    info!("Starting HashSwap simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = ScenarioSettings {
        traders: args.traders,
        rounds: args.rounds,
        trade_size: args.trade_size,
        liquidity: args.liquidity,
        idle_blocks: args.idle_blocks,
    };
    let report = Scenario::deploy(&config, settings)?
        .run()
        .context("Scenario failed")?;

    let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
    println!("{}", json);
    Ok(())
}
