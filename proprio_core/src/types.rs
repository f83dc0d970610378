// proprio_core/src/types.rs

use nalgebra::{SMatrix, SVector};

/// Number of sensor axes (gyros, accelerometers, magnetometers).
pub const NUMAXIS: usize = 3;

/// Dimension of the SCKF error state: pos, vel, att, gyro bias, accel bias.
pub const SCKF_ERROR_DIM: usize = 15;

/// Dimension of the attitude sub-state (att, gyro bias, accel bias).
pub const ATTITUDE_ERROR_DIM: usize = 9;

/// Dimension of the combined SCKF measurement (velocity + gravity).
pub const SCKF_MEASUREMENT_DIM: usize = 6;

pub type Vector15 = SVector<f64, SCKF_ERROR_DIM>;
pub type Matrix15 = SMatrix<f64, SCKF_ERROR_DIM, SCKF_ERROR_DIM>;
pub type Matrix9 = SMatrix<f64, ATTITUDE_ERROR_DIM, ATTITUDE_ERROR_DIM>;
pub type Vector9 = SVector<f64, ATTITUDE_ERROR_DIM>;
pub type Matrix3x9 = SMatrix<f64, NUMAXIS, ATTITUDE_ERROR_DIM>;
pub type Matrix6x15 = SMatrix<f64, SCKF_MEASUREMENT_DIM, SCKF_ERROR_DIM>;
pub type Matrix15x6 = SMatrix<f64, SCKF_ERROR_DIM, SCKF_MEASUREMENT_DIM>;
pub type Matrix9x6 = SMatrix<f64, ATTITUDE_ERROR_DIM, SCKF_MEASUREMENT_DIM>;

// --- Unit conversions (presentation only) ---
pub const R2D: f64 = 180.0 / std::f64::consts::PI;
pub const D2R: f64 = std::f64::consts::PI / 180.0;
