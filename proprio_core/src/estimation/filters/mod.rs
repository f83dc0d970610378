// proprio_core/src/estimation/filters/mod.rs

pub mod sckf;
pub mod usckf;

pub use sckf::Sckf;
pub use usckf::Usckf;
