// proprio_core/src/math/manifold.rs

use nalgebra::{DVector, UnitQuaternion, Vector3};
use std::fmt::Debug;

use crate::math::quaternion::from_error_vector;

/// The capability set every filter state shares: a fixed number of degrees of
/// freedom, a displacement operator (boxplus) and a difference operator (boxminus).
///
/// For a manifold `M`, `x.boxplus(&y.boxminus(&x)) == y` must hold for states
/// inside the chart's validity region, and `x.boxminus(&x)` must be zero.
pub trait Manifold: Clone + Debug {
    /// Degrees of freedom, i.e. the length of the tangent vectors.
    fn dof(&self) -> usize;

    /// Applies a tangent displacement `delta` (`delta.len() == self.dof()`).
    fn boxplus(&self, delta: &[f64]) -> Self;

    /// Tangent vector `d` such that `other.boxplus(&d) == self`.
    fn boxminus(&self, other: &Self) -> DVector<f64>;

    /// Flat "error quaternion" serialization.
    ///
    /// Vector parts are copied as-is. Orientations contribute the vector part of the
    /// quaternion, which is half the rotation angle for small rotations.
    fn vectorized(&self) -> DVector<f64>;

    /// Inverse of [`Manifold::vectorized`]. Orientations are rebuilt as `(1, v)` normalized.
    fn set_vectorized(&mut self, v: &[f64]);

    /// In-place boxplus.
    fn boxplus_assign(&mut self, delta: &[f64]) {
        *self = self.boxplus(delta);
    }
}

// --- Euclidean parts ---

impl Manifold for Vector3<f64> {
    fn dof(&self) -> usize {
        3
    }

    fn boxplus(&self, delta: &[f64]) -> Self {
        self + Vector3::new(delta[0], delta[1], delta[2])
    }

    fn boxminus(&self, other: &Self) -> DVector<f64> {
        DVector::from_column_slice((self - other).as_slice())
    }

    fn vectorized(&self) -> DVector<f64> {
        DVector::from_column_slice(self.as_slice())
    }

    fn set_vectorized(&mut self, v: &[f64]) {
        self.copy_from_slice(&v[..3]);
    }
}

impl Manifold for DVector<f64> {
    fn dof(&self) -> usize {
        self.len()
    }

    fn boxplus(&self, delta: &[f64]) -> Self {
        self + DVector::from_column_slice(&delta[..self.len()])
    }

    fn boxminus(&self, other: &Self) -> DVector<f64> {
        self - other
    }

    fn vectorized(&self) -> DVector<f64> {
        self.clone()
    }

    fn set_vectorized(&mut self, v: &[f64]) {
        let n = self.len();
        self.copy_from_slice(&v[..n]);
    }
}

// --- SO(3) ---

/// `q ⊞ d = q * exp(d)` and `q1 ⊟ q2 = log(q2⁻¹ * q1)`, with `d` a rotation vector.
impl Manifold for UnitQuaternion<f64> {
    fn dof(&self) -> usize {
        3
    }

    fn boxplus(&self, delta: &[f64]) -> Self {
        self * UnitQuaternion::from_scaled_axis(Vector3::new(delta[0], delta[1], delta[2]))
    }

    fn boxminus(&self, other: &Self) -> DVector<f64> {
        let d = (other.inverse() * self).scaled_axis();
        DVector::from_column_slice(d.as_slice())
    }

    fn vectorized(&self) -> DVector<f64> {
        DVector::from_column_slice(&[self.i, self.j, self.k])
    }

    fn set_vectorized(&mut self, v: &[f64]) {
        *self = from_error_vector(&Vector3::new(v[0], v[1], v[2]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_so3_boxminus_inverts_boxplus() {
        let q = UnitQuaternion::from_euler_angles(0.5, -0.3, 2.0);
        let d = [0.1, -0.2, 0.05];

        let moved = q.boxplus(&d);
        let back = moved.boxminus(&q);

        assert_relative_eq!(back, DVector::from_column_slice(&d), epsilon = 1e-12);
    }

    #[test]
    fn test_so3_boxminus_of_self_is_zero() {
        let q = UnitQuaternion::from_euler_angles(-1.0, 0.2, 0.7);
        assert_relative_eq!(q.boxminus(&q), DVector::zeros(3), epsilon = 1e-12);
    }

    #[test]
    fn test_so3_vectorized_is_half_angle_for_small_rotations() {
        let d = [1e-4, 0.0, 0.0];
        let q = UnitQuaternion::identity().boxplus(&d);

        assert_relative_eq!(q.vectorized()[0], 0.5e-4, epsilon = 1e-12);

        let mut r = UnitQuaternion::identity();
        r.set_vectorized(q.vectorized().as_slice());
        assert_relative_eq!(r.angle_to(&q), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_vector_parts_are_additive() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let w = v.boxplus(&[0.5, -1.0, 0.0]);

        assert_relative_eq!(w, Vector3::new(1.5, 1.0, 3.0));
        assert_relative_eq!(w.boxminus(&v), DVector::from_column_slice(&[0.5, -1.0, 0.0]));
    }
}
