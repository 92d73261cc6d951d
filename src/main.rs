// src/main.rs - Host simulator for the stove interposer
use std::time::Duration;

use clap::Parser;
use stove_interposer::config::{self, Config};
use stove_interposer::simulator::{Simulation, TokioClock, run_probe};

/// Run the interposer against a simulated stove, kettle and probe.
#[derive(Parser, Debug)]
#[command(name = "stove-sim", about = "Stove interposer host simulation")]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 600)]
    duration_s: u64,

    /// Run on a paused clock that jumps ahead instead of waiting
    #[arg(long)]
    fast: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

const TICK_MS: u64 = 10;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    tracing::info!("Starting stove interposer simulation");

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
            })?
        }
        None => Config::default(),
    };

    let runtime = if cli.fast {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()?
    } else {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()?
    };

    runtime.block_on(simulate(config, Duration::from_secs(cli.duration_s)));
    Ok(())
}

async fn simulate(config: Config, duration: Duration) {
    let probe_interval_ms = config.sim.probe_interval_ms;
    let (mut simulation, radio) = Simulation::new(config, TokioClock::new());
    let probe = tokio::spawn(run_probe(radio, probe_interval_ms));

    let deadline = tokio::time::Instant::now() + duration;
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    while tokio::time::Instant::now() < deadline {
        ticker.tick().await;
        simulation.tick();
    }

    probe.abort();
    tracing::info!("Simulation finished: {}", simulation.summary());
}
