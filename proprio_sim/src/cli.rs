// proprio_sim/src/cli.rs

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Proprio: stationary-platform attitude estimation scenarios.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the proprio simulation library.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run. Built-in defaults when omitted.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Override the PRNG seed of the scenario.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of simulated steps.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Which estimator to run.
    #[arg(short, long, value_enum, default_value_t = FilterChoice::Both)]
    pub filter: FilterChoice,

    /// Print the resolved scenario as TOML and exit.
    #[arg(long, default_value_t = false)]
    pub dump_config: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChoice {
    Sckf,
    Usckf,
    Both,
}

impl FilterChoice {
    pub fn runs_sckf(self) -> bool {
        matches!(self, FilterChoice::Sckf | FilterChoice::Both)
    }

    pub fn runs_usckf(self) -> bool {
        matches!(self, FilterChoice::Usckf | FilterChoice::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from(["proprio_sim", "--seed", "3", "--filter", "usckf"]);

        assert_eq!(cli.seed, Some(3));
        assert_eq!(cli.filter, FilterChoice::Usckf);
        assert!(cli.scenario.is_none());
        assert!(!cli.filter.runs_sckf());
    }

    #[test]
    fn test_default_runs_both() {
        let cli = Cli::parse_from(["proprio_sim"]);
        assert!(cli.filter.runs_sckf() && cli.filter.runs_usckf());
    }
}
