// proprio_core/src/models/estimation/measurement/magnetometer.rs

use nalgebra::{UnitQuaternion, Vector3};

/// Unit magnetic field in the navigation frame for a given dip angle (radians).
///
/// The horizontal component points along +x (magnetic north) and the field dips
/// below the horizon by `dip_angle`.
pub fn magnetic_reference(dip_angle: f64) -> Vector3<f64> {
    Vector3::new(dip_angle.cos(), 0.0, -dip_angle.sin())
}

/// Field a magnetometer at `orient` (body to navigation) should read.
pub fn predicted_body_field(orient: &UnitQuaternion<f64>, reference: &Vector3<f64>) -> Vector3<f64> {
    orient.inverse() * reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_is_unit_and_dips_down() {
        let m = magnetic_reference(1.0);
        assert_relative_eq!(m.norm(), 1.0, epsilon = 1e-15);
        assert!(m.z < 0.0);
        assert_eq!(m.y, 0.0);
    }

    #[test]
    fn test_yawed_body_sees_rotated_field() {
        let m = magnetic_reference(0.0);
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);

        assert_relative_eq!(predicted_body_field(&q, &m), -Vector3::y(), epsilon = 1e-12);
    }
}
