// proprio_sim/src/main.rs

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use proprio_sim::cli::Cli;
use proprio_sim::simulation::config::load_scenario;
use proprio_sim::simulation::core::run;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_scenario(&cli)?;

    if cli.dump_config {
        print!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    run(&config, cli.filter)?;
    Ok(())
}
