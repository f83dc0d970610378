// proprio_core/src/models/estimation/dynamics/mod.rs

use std::fmt::Debug;

use crate::messages::ImuSample;
use crate::math::manifold::Manifold;
use crate::states::SingleState;
use crate::types::{Matrix15, Vector15};

pub mod strapdown;

/// A trait for error-state dynamics driven by inertial samples.
///
/// Implementors provide the continuous-time linearization at the nominal state; the
/// discretization and the propagation of an error state come for free.
pub trait ErrorDynamics: Debug + Send + Sync {
    /// Continuous-time Jacobian `F` of the error state around `nominal`.
    ///
    /// # Arguments
    /// * `nominal`: The current nominal state (orientation and biases are used).
    /// * `imu`: The raw inertial sample driving the step.
    fn error_jacobian(&self, nominal: &SingleState, imu: &ImuSample) -> Matrix15;

    /// Continuous-time process noise `Q` for a step of length `dt`.
    fn process_noise(&self, nominal: &SingleState, dt: f64) -> Matrix15;

    /// Second-order Taylor transition `Φ = I + F dt + F² dt² / 2`.
    fn transition(&self, nominal: &SingleState, imu: &ImuSample, dt: f64) -> Matrix15 {
        discretize_transition(&self.error_jacobian(nominal, imu), dt)
    }

    /// Discrete noise `Qd = Q dt + ½ dt² (F Q + Q Fᵀ)`, symmetrized.
    fn discrete_noise(&self, nominal: &SingleState, imu: &ImuSample, dt: f64) -> Matrix15 {
        let f = self.error_jacobian(nominal, imu);
        discretize_noise(&f, &self.process_noise(nominal, dt), dt)
    }

    /// Pushes an error state through `Φ` in its vectorized coordinates.
    fn propagate_error(&self, error: &SingleState, phi: &Matrix15) -> SingleState {
        let x = Vector15::from_column_slice(error.vectorized().as_slice());
        let mut next = error.clone();
        next.set_vectorized((phi * x).as_slice());
        next
    }
}

pub fn discretize_transition(f: &Matrix15, dt: f64) -> Matrix15 {
    Matrix15::identity() + f * dt + f * f * (dt * dt / 2.0)
}

pub fn discretize_noise(f: &Matrix15, q: &Matrix15, dt: f64) -> Matrix15 {
    let qd = q * dt + (f * q + q * f.transpose()) * (0.5 * dt * dt);
    (qd + qd.transpose()) * 0.5
}
