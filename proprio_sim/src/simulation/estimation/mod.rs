// proprio_sim/src/simulation/estimation/mod.rs

// Thin drivers that feed simulated samples into the core filters.
pub mod sckf;
pub mod usckf;

pub use sckf::SckfRunner;
pub use usckf::UsckfRunner;
