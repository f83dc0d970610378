// proprio_sim/src/simulation/mod.rs

pub mod config;
pub mod core;
pub mod debugging;
pub mod estimation;
pub mod sensors;
