// proprio_core/src/models/estimation/measurement/proprioceptive.rs

use nalgebra::{Matrix3, Matrix6, UnitQuaternion, Vector3, Vector6};

use crate::math::manifold::Manifold;
use crate::math::quaternion::skew;
use crate::states::{ErrorBlock, SingleState};
use crate::types::{Matrix6x15, Vector15};

/// Observation matrix of the proprioceptive measurement `[velocity; gravity]`.
///
/// The first three rows observe the velocity error. The last three observe the
/// attitude error through the body-frame gravity and the accelerometer bias.
pub fn proprioceptive_measurement_matrix(
    orient: &UnitQuaternion<f64>,
    gravity: f64,
) -> Matrix6x15 {
    let gravity_body = orient.inverse() * Vector3::new(0.0, 0.0, gravity);

    let mut h = Matrix6x15::zeros();
    h.fixed_view_mut::<3, 3>(0, ErrorBlock::Velocity.offset())
        .copy_from(&Matrix3::identity());
    h.fixed_view_mut::<3, 3>(3, ErrorBlock::Attitude.offset())
        .copy_from(&(skew(&gravity_body) * 2.0));
    h.fixed_view_mut::<3, 3>(3, ErrorBlock::AccelBias.offset())
        .copy_from(&Matrix3::identity());
    h
}

/// Predicted measurement `H * x` for a single-epoch state in vectorized form.
pub fn proprioceptive_measurement_model(state: &SingleState, h: &Matrix6x15) -> Vector6<f64> {
    h * Vector15::from_column_slice(state.vectorized().as_slice())
}

/// Measurement noise of the proprioceptive measurement.
///
/// Only the gravity block is populated, from the accelerometer random walk
/// `accrw` (per axis, in m/s/sqrt(s)) sampled at `dt`.
pub fn proprioceptive_measurement_noise_cov(accrw: &Vector3<f64>, dt: f64) -> Matrix6<f64> {
    let sqrtdelta_t = dt.sqrt();
    let mut r = Matrix6::zeros();
    for i in 0..3 {
        r[(3 + i, 3 + i)] = 3.0 * (accrw[i] / sqrtdelta_t).powi(2);
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_layout_level_orientation() {
        let h = proprioceptive_measurement_matrix(&UnitQuaternion::identity(), 9.81);

        assert_eq!(h[(0, 3)], 1.0);
        assert_eq!(h[(2, 5)], 1.0);
        // 2 * skew([0, 0, g])
        assert_relative_eq!(h[(3, 7)], -2.0 * 9.81);
        assert_relative_eq!(h[(4, 6)], 2.0 * 9.81);
        assert_eq!(h[(3, 12)], 1.0);
        assert_eq!(h[(5, 14)], 1.0);
        assert_eq!(h.column(0).norm(), 0.0);
    }

    #[test]
    fn test_model_picks_velocity_and_bias() {
        let state = SingleState {
            vel: Vector3::new(0.1, 0.2, 0.3),
            abias: Vector3::new(0.01, 0.0, -0.01),
            ..SingleState::default()
        };
        let h = proprioceptive_measurement_matrix(&UnitQuaternion::identity(), 9.81);
        let z = proprioceptive_measurement_model(&state, &h);

        assert_relative_eq!(z, Vector6::new(0.1, 0.2, 0.3, 0.01, 0.0, -0.01), epsilon = 1e-15);
    }

    #[test]
    fn test_noise_cov() {
        let r = proprioceptive_measurement_noise_cov(&Vector3::new(0.01, 0.02, 0.03), 0.01);

        assert_relative_eq!(r[(3, 3)], 3.0 * 0.01, epsilon = 1e-15);
        assert_relative_eq!(r[(5, 5)], 3.0 * 0.09, epsilon = 1e-15);
        assert_eq!(r[(0, 0)], 0.0);
    }
}
