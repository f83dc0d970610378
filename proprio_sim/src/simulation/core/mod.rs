// proprio_sim/src/simulation/core/mod.rs

pub mod prng;
pub mod runner;

pub use runner::{run, RunSummary};
