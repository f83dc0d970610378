// proprio_sim/src/simulation/config/mod.rs

//! This module handles loading and layering the scenario configuration:
//! built-in defaults, then the scenario file, then command-line overrides.

pub mod structs;

use anyhow::Context;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use tracing::info;

use crate::cli::Cli;
pub use structs::{BurstConfig, EstimatorConfig, ImuConfig, ScenarioConfig, Simulation, World};

/// Builds the scenario for a run.
pub fn load_scenario(cli: &Cli) -> anyhow::Result<ScenarioConfig> {
    let mut figment = Figment::from(Serialized::defaults(ScenarioConfig::default()));

    if let Some(path) = &cli.scenario {
        anyhow::ensure!(path.exists(), "scenario file {} not found", path.display());
        info!("Loading scenario from: {}", path.display());
        figment = figment.merge(Toml::file(path));
    }
    if let Some(seed) = cli.seed {
        figment = figment.merge(Serialized::default("simulation.seed", seed));
    }
    if let Some(steps) = cli.steps {
        figment = figment.merge(Serialized::default("simulation.steps", steps));
    }

    let config: ScenarioConfig = figment
        .extract()
        .context("failed to load or parse the scenario configuration")?;

    anyhow::ensure!(config.simulation.dt > 0.0, "simulation.dt must be positive");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FilterChoice;

    fn cli() -> Cli {
        Cli {
            scenario: None,
            seed: None,
            steps: None,
            filter: FilterChoice::Both,
            dump_config: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_scenario(&cli()).unwrap();
        assert_eq!(config, ScenarioConfig::default());
    }

    #[test]
    fn test_cli_overrides() {
        let config = load_scenario(&Cli {
            seed: Some(9),
            steps: Some(25),
            ..cli()
        })
        .unwrap();

        assert_eq!(config.simulation.seed, 9);
        assert_eq!(config.simulation.steps, 25);
        assert_eq!(config.simulation.dt, Simulation::default().dt);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_scenario(&Cli {
            scenario: Some("does/not/exist.toml".into()),
            ..cli()
        });
        assert!(result.is_err());
    }
}
