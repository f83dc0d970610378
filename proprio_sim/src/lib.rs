// proprio_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the proprio_sim crate.
pub mod prelude;

// Command-line arguments shared by every binary built on this library.
pub mod cli;
// This module contains all the simulation-specific logic.
pub mod simulation;
