// proprio_core/src/models/estimation/measurement/mod.rs

pub mod adaptive;
pub mod data_model;
pub mod magnetometer;
pub mod proprioceptive;

pub use adaptive::AdaptiveAttitudeCov;
pub use data_model::DataModel;
pub use proprioceptive::{
    proprioceptive_measurement_matrix, proprioceptive_measurement_model,
    proprioceptive_measurement_noise_cov,
};
