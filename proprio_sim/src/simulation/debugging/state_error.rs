// proprio_sim/src/simulation/debugging/state_error.rs

use nalgebra::{UnitQuaternion, Vector3};
use tracing::info;

use proprio_core::math::quaternion::euler_zyx;
use proprio_core::messages::AttitudeOutput;
use proprio_core::types::R2D;

// =========================================================================
// == Attitude Error ==
// =========================================================================

/// Angle in degrees of the rotation that takes the estimate onto the truth.
pub fn attitude_error_deg(truth: &UnitQuaternion<f64>, estimate: &UnitQuaternion<f64>) -> f64 {
    // error_rot = true_rot * estimated_rot_inverse
    let error_rotation = truth * estimate.inverse();
    error_rotation.angle() * R2D
}

/// ZYX `[roll, pitch, yaw]` of `q` in degrees.
pub fn euler_deg(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    euler_zyx(q) * R2D
}

/// Logs the attitude error of one filter output against the ground truth.
pub fn log_attitude_error(filter: &str, truth: &UnitQuaternion<f64>, output: &AttitudeOutput) -> f64 {
    let attitude_error_degrees = attitude_error_deg(truth, &output.orientation);
    let rpy = euler_deg(&output.orientation);

    info!(
        "{} State Error | t: {:.2}s | Att Err: {:.3}° | rpy: ({:.2}°, {:.2}°, {:.2}°) | ext acc: {}",
        filter,
        output.timestamp,
        attitude_error_degrees,
        rpy.x,
        rpy.y,
        rpy.z,
        output.external_acceleration,
    );
    attitude_error_degrees
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_attitude_error_is_rotation_angle() {
        let truth = UnitQuaternion::identity();
        let estimate = UnitQuaternion::from_euler_angles(0.0, 0.0, 10.0_f64.to_radians());

        assert_relative_eq!(attitude_error_deg(&truth, &estimate), 10.0, epsilon = 1e-9);
        assert_relative_eq!(attitude_error_deg(&estimate, &estimate), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_euler_in_degrees() {
        let q = UnitQuaternion::from_euler_angles(
            5.0_f64.to_radians(),
            -3.0_f64.to_radians(),
            30.0_f64.to_radians(),
        );

        assert_relative_eq!(euler_deg(&q), Vector3::new(5.0, -3.0, 30.0), epsilon = 1e-9);
    }
}
