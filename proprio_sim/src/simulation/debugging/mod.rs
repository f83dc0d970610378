// proprio_sim/src/simulation/debugging/mod.rs

pub mod state_error;

pub use state_error::{attitude_error_deg, euler_deg, log_attitude_error};
