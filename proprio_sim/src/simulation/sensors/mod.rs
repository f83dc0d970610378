// proprio_sim/src/simulation/sensors/mod.rs

pub mod imu;

pub use imu::ImuSource;
