// proprio_sim/src/prelude.rs

// Re-export the entire proprio_core prelude so you can easily access
// pure types like `Sckf`, `Usckf`, `SingleState`, etc.
pub use proprio_core::prelude::*;

// Re-export common simulation-specific types for easy access in other modules.
pub use crate::cli::{Cli, FilterChoice};
pub use crate::simulation::config::{load_scenario, structs::*};
pub use crate::simulation::core::{run, RunSummary};
pub use crate::simulation::estimation::{SckfRunner, UsckfRunner};
pub use crate::simulation::sensors::ImuSource;
