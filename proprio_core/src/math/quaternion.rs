// proprio_core/src/math/quaternion.rs

use nalgebra::{Matrix3, Matrix4, Quaternion, UnitQuaternion, Vector3, Vector4};

/// Direction cosine matrix of `q`, mapping navigation-frame vectors into the body frame.
///
/// This is the transpose of the body-to-navigation rotation held by `q`.
pub fn quaternion_to_dcm(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    Matrix3::new(
        2.0 * q0 * q0 + 2.0 * q1 * q1 - 1.0,
        2.0 * q1 * q2 + 2.0 * q0 * q3,
        2.0 * q1 * q3 - 2.0 * q0 * q2,
        2.0 * q1 * q2 - 2.0 * q0 * q3,
        2.0 * q0 * q0 + 2.0 * q2 * q2 - 1.0,
        2.0 * q2 * q3 + 2.0 * q0 * q1,
        2.0 * q1 * q3 + 2.0 * q0 * q2,
        2.0 * q2 * q3 - 2.0 * q0 * q1,
        2.0 * q0 * q0 + 2.0 * q3 * q3 - 1.0,
    )
}

/// Cross-product matrix: `skew(a) * b == a.cross(&b)`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Quaternion kinematics matrix for a body rate, acting on `(w, x, y, z)` columns.
pub fn omega_matrix(w: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        0.0, -w.x, -w.y, -w.z, //
        w.x, 0.0, w.z, -w.y, //
        w.y, -w.z, 0.0, w.x, //
        w.z, w.y, -w.x, 0.0,
    )
}

/// `(w, x, y, z)` column of a quaternion.
pub fn to_wxyz(q: &UnitQuaternion<f64>) -> Vector4<f64> {
    Vector4::new(q.w, q.i, q.j, q.k)
}

/// Builds a normalized quaternion from a `(w, x, y, z)` column.
pub fn from_wxyz(v: &Vector4<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(v[0], v[1], v[2], v[3]))
}

/// Small-angle error quaternion `(1, v)` normalized.
pub fn from_error_vector(v: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::new(1.0, v.x, v.y, v.z))
}

/// ZYX Euler angles as `[roll, pitch, yaw]`.
pub fn euler_zyx(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = q.euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Inverse of [`euler_zyx`]: `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn from_euler_zyx(roll: f64, pitch: f64, yaw: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const F64_EPSILON: f64 = 1e-12;

    #[test]
    fn test_dcm_is_transpose_of_rotation() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        let dcm = quaternion_to_dcm(&q);
        let expected = q.to_rotation_matrix().into_inner().transpose();

        assert_relative_eq!(dcm, expected, epsilon = F64_EPSILON);
    }

    #[test]
    fn test_dcm_maps_navigation_to_body() {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        // A 90 degree yaw sees the navigation x axis along body -y.
        let v_body = quaternion_to_dcm(&q) * Vector3::x();

        assert_relative_eq!(v_body, -Vector3::y(), epsilon = F64_EPSILON);
    }

    #[test]
    fn test_skew_matches_cross_product() {
        let a = Vector3::new(1.0, -2.0, 0.5);
        let b = Vector3::new(0.3, 4.0, -1.0);

        assert_relative_eq!(skew(&a) * b, a.cross(&b), epsilon = F64_EPSILON);
    }

    #[test]
    fn test_omega_matrix_is_right_product_with_pure_rate() {
        let q = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let w = Vector3::new(0.4, -0.5, 0.6);
        let expected = q.into_inner() * Quaternion::new(0.0, w.x, w.y, w.z);

        let got = omega_matrix(&w) * to_wxyz(&q);

        assert_relative_eq!(got, Vector4::new(expected.w, expected.i, expected.j, expected.k), epsilon = F64_EPSILON);
    }

    #[test]
    fn test_euler_round_trip() {
        let q = from_euler_zyx(0.2, -0.4, 2.5);
        let euler = euler_zyx(&q);

        assert_relative_eq!(euler, Vector3::new(0.2, -0.4, 2.5), epsilon = 1e-10);
    }
}
