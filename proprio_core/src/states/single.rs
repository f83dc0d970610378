// proprio_core/src/states/single.rs

use nalgebra::{DVector, UnitQuaternion, Vector3};

use crate::math::manifold::Manifold;
use crate::states::layout::ErrorBlock;
use crate::states::ErrorState;

/// Inertial state of one epoch: `(pos, vel, orient, gbias, abias)`.
///
/// Used both as the nominal state and, with the same layout, as its error.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleState {
    /// Position in the navigation frame.
    pub pos: Vector3<f64>,
    /// Velocity in the navigation frame.
    pub vel: Vector3<f64>,
    /// Body-to-navigation orientation.
    pub orient: UnitQuaternion<f64>,
    /// Gyroscope bias.
    pub gbias: Vector3<f64>,
    /// Accelerometer bias.
    pub abias: Vector3<f64>,
}

impl Default for SingleState {
    fn default() -> Self {
        Self {
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            orient: UnitQuaternion::identity(),
            gbias: Vector3::zeros(),
            abias: Vector3::zeros(),
        }
    }
}

impl SingleState {
    pub const DOF: usize = 15;

    /// Reads one named block out of a tangent or vectorized slice.
    fn block(v: &[f64], block: ErrorBlock) -> &[f64] {
        &v[block.range()]
    }
}

impl Manifold for SingleState {
    fn dof(&self) -> usize {
        Self::DOF
    }

    fn boxplus(&self, delta: &[f64]) -> Self {
        Self {
            pos: self.pos.boxplus(Self::block(delta, ErrorBlock::Position)),
            vel: self.vel.boxplus(Self::block(delta, ErrorBlock::Velocity)),
            orient: self.orient.boxplus(Self::block(delta, ErrorBlock::Attitude)),
            gbias: self.gbias.boxplus(Self::block(delta, ErrorBlock::GyroBias)),
            abias: self.abias.boxplus(Self::block(delta, ErrorBlock::AccelBias)),
        }
    }

    fn boxminus(&self, other: &Self) -> DVector<f64> {
        let mut d = DVector::zeros(Self::DOF);
        let parts = [
            (ErrorBlock::Position, self.pos.boxminus(&other.pos)),
            (ErrorBlock::Velocity, self.vel.boxminus(&other.vel)),
            (ErrorBlock::Attitude, self.orient.boxminus(&other.orient)),
            (ErrorBlock::GyroBias, self.gbias.boxminus(&other.gbias)),
            (ErrorBlock::AccelBias, self.abias.boxminus(&other.abias)),
        ];
        for (block, part) in parts {
            d.rows_mut(block.offset(), block.size()).copy_from(&part);
        }
        d
    }

    fn vectorized(&self) -> DVector<f64> {
        let mut v = DVector::zeros(Self::DOF);
        v.fixed_rows_mut::<3>(ErrorBlock::Position.offset()).copy_from(&self.pos);
        v.fixed_rows_mut::<3>(ErrorBlock::Velocity.offset()).copy_from(&self.vel);
        v.fixed_rows_mut::<3>(ErrorBlock::Attitude.offset())
            .copy_from(&self.orient.imag());
        v.fixed_rows_mut::<3>(ErrorBlock::GyroBias.offset()).copy_from(&self.gbias);
        v.fixed_rows_mut::<3>(ErrorBlock::AccelBias.offset()).copy_from(&self.abias);
        v
    }

    fn set_vectorized(&mut self, v: &[f64]) {
        self.pos.set_vectorized(Self::block(v, ErrorBlock::Position));
        self.vel.set_vectorized(Self::block(v, ErrorBlock::Velocity));
        self.orient.set_vectorized(Self::block(v, ErrorBlock::Attitude));
        self.gbias.set_vectorized(Self::block(v, ErrorBlock::GyroBias));
        self.abias.set_vectorized(Self::block(v, ErrorBlock::AccelBias));
    }
}

impl ErrorState for SingleState {
    const DOF: usize = SingleState::DOF;

    fn inject_into(&self, nominal: &mut Self) {
        nominal.pos += self.pos;
        nominal.vel += self.vel;
        // Re-wrapping renormalizes the product.
        nominal.orient = UnitQuaternion::new_normalize(nominal.orient.into_inner() * self.orient.into_inner());
        nominal.gbias += self.gbias;
        nominal.abias += self.abias;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_state() -> SingleState {
        SingleState {
            pos: Vector3::new(1.0, 2.0, 3.0),
            vel: Vector3::new(-0.1, 0.0, 0.2),
            orient: UnitQuaternion::from_euler_angles(0.1, 0.2, -0.3),
            gbias: Vector3::new(1e-3, 0.0, -1e-3),
            abias: Vector3::new(0.0, 2e-2, 0.0),
        }
    }

    #[test]
    fn test_boxplus_boxminus_consistency() {
        let x = sample_state();
        let delta: Vec<f64> = (0..15).map(|i| 0.01 * (i as f64 - 7.0)).collect();

        let y = x.boxplus(&delta);
        let back = y.boxminus(&x);

        assert_relative_eq!(back, DVector::from_vec(delta), epsilon = 1e-12);
    }

    #[test]
    fn test_vectorized_layout() {
        let x = sample_state();
        let v = x.vectorized();

        assert_eq!(v.len(), 15);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[5], 0.2);
        assert_eq!(v[6], x.orient.i);
        assert_eq!(v[13], 2e-2);
    }

    #[test]
    fn test_inject_and_reset() {
        let mut nominal = sample_state();
        let mut error = SingleState::default();
        error.pos = Vector3::new(0.5, 0.0, 0.0);
        error.orient = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.1);

        error.inject_into(&mut nominal);
        assert_relative_eq!(nominal.pos, Vector3::new(1.5, 2.0, 3.0));
        assert_relative_eq!(nominal.orient.norm(), 1.0, epsilon = 1e-12);

        error.reset();
        assert_eq!(error, SingleState::default());
    }
}
