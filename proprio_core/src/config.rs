// proprio_core/src/config.rs

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::types::Matrix15;

// =========================================================================
// == Tunables injected at construction ==
// =========================================================================

/// Parameters of the adaptive external-acceleration estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptiveConfig {
    /// Length of the residual history window.
    pub m1: usize,
    /// Number of quiet calls after which the inflation is released.
    pub m2: usize,
    /// Detection threshold on `max(lambda - mu)`.
    pub gamma: f64,
    /// Initial value of the quiet counter.
    pub r2count: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            m1: 10,
            m2: 3,
            gamma: 0.1,
            r2count: 100,
        }
    }
}

/// Convergence settings for the iterative manifold mean of sigma points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsckfConfig {
    pub mean_tolerance: f64,
    pub mean_max_iterations: usize,
}

impl Default for UsckfConfig {
    fn default() -> Self {
        Self {
            mean_tolerance: 1e-6,
            mean_max_iterations: 10_000,
        }
    }
}

/// Noise blocks of the SCKF, all 3x3 and expressed per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SckfNoise {
    /// Gyro random walk.
    pub rg: Matrix3<f64>,
    /// Gyro bias random walk.
    pub qbg: Matrix3<f64>,
    /// Accelerometer bias random walk.
    pub qba: Matrix3<f64>,
    /// Accelerometer white noise.
    pub ra: Matrix3<f64>,
    /// Accelerometer turn-on / instability noise added to the gravity measurement.
    pub rat: Matrix3<f64>,
    /// Magnetometer noise. Held for the magnetic heading path, which is not fused.
    pub rm: Matrix3<f64>,
}

impl SckfNoise {
    /// Builds diagonal blocks from per-axis standard deviations.
    pub fn from_std_devs(
        gyro_rw: [f64; 3],
        gyro_bias_rw: [f64; 3],
        accel_bias_rw: [f64; 3],
        accel_noise: [f64; 3],
        accel_instability: [f64; 3],
        mag_noise: [f64; 3],
    ) -> Self {
        let diag = |s: [f64; 3]| {
            Matrix3::from_diagonal(&Vector3::new(s[0].powi(2), s[1].powi(2), s[2].powi(2)))
        };
        Self {
            rg: diag(gyro_rw),
            qbg: diag(gyro_bias_rw),
            qba: diag(accel_bias_rw),
            ra: diag(accel_noise),
            rat: diag(accel_instability),
            rm: diag(mag_noise),
        }
    }
}

impl Default for SckfNoise {
    fn default() -> Self {
        Self::from_std_devs(
            [1e-3; 3],
            [1e-5; 3],
            [1e-4; 3],
            [1e-2; 3],
            [1e-3; 3],
            [1e-3; 3],
        )
    }
}

/// Everything `Sckf::new` needs.
#[derive(Debug, Clone)]
pub struct SckfConfig {
    /// Initial error-state covariance (15x15, positive definite).
    pub p0: Matrix15,
    pub noise: SckfNoise,
    /// Local gravity magnitude in m/s^2.
    pub gravity: f64,
    /// Magnetic dip angle in radians.
    pub dip_angle: f64,
    pub adaptive: AdaptiveConfig,
}

impl Default for SckfConfig {
    fn default() -> Self {
        Self {
            p0: Matrix15::identity() * 1e-4,
            noise: SckfNoise::default(),
            gravity: 9.81,
            dip_angle: 0.0,
            adaptive: AdaptiveConfig::default(),
        }
    }
}
