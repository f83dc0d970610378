// proprio_core/src/lib.rs

// This file defines the public modules of your library.
pub mod config;
pub mod error;
pub mod estimation;
pub mod math;
pub mod messages;
pub mod models;
pub mod prelude;
pub mod states;
pub mod types;
