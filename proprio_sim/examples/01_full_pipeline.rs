// proprio_sim/examples/01_full_pipeline.rs

//! A full end-to-end run of both attitude estimators.
//!
//! This example demonstrates how to:
//! 1. Load a scenario from a TOML file.
//! 2. Run the SCKF and the USCKF over the same simulated IMU stream.
//! 3. Read back the per-filter summaries.
//!
//! To run this example:
//! `cargo run --example 01_full_pipeline`

use clap::Parser;
use proprio_sim::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 1. Load Simulation Configuration ---
    let scenario_path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/scenarios/stationary_burst.toml");
    let cli = Cli::parse_from(["01_full_pipeline", "--scenario", scenario_path]);
    let config = load_scenario(&cli)?;

    // --- 2. Run ---
    let summaries = run(&config, FilterChoice::Both)?;

    // --- 3. Report ---
    for summary in summaries {
        println!("{}", toml::to_string(&summary)?);
    }
    Ok(())
}
