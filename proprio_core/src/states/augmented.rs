// proprio_core/src/states/augmented.rs

use nalgebra::DVector;

use crate::math::manifold::Manifold;
use crate::states::layout::Epoch;
use crate::states::ErrorState;

/// Three epoch slots of a single state plus two dynamically sized feature blocks.
///
/// Storage order is `statek, statek_l, statek_i, featuresk, featuresk_l`, which is
/// also the row order of the augmented covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedState<S> {
    pub statek: S,
    pub statek_l: S,
    pub statek_i: S,
    pub featuresk: DVector<f64>,
    pub featuresk_l: DVector<f64>,
}

impl<S: ErrorState> AugmentedState<S> {
    /// All three epochs start as copies of `single`, with no features.
    pub fn new(single: S) -> Self {
        Self::with_features(single, DVector::zeros(0), DVector::zeros(0))
    }

    pub fn with_features(single: S, featuresk: DVector<f64>, featuresk_l: DVector<f64>) -> Self {
        Self {
            statek: single.clone(),
            statek_l: single.clone(),
            statek_i: single,
            featuresk,
            featuresk_l,
        }
    }

    pub fn epoch(&self, epoch: Epoch) -> &S {
        match epoch {
            Epoch::K => &self.statek,
            Epoch::KL => &self.statek_l,
            Epoch::KI => &self.statek_i,
        }
    }

    pub fn epoch_mut(&mut self, epoch: Epoch) -> &mut S {
        match epoch {
            Epoch::K => &mut self.statek,
            Epoch::KL => &mut self.statek_l,
            Epoch::KI => &mut self.statek_i,
        }
    }

    /// Offset of the first feature block in tangent coordinates.
    fn features_offset() -> usize {
        3 * S::DOF
    }
}

impl<S: ErrorState> Manifold for AugmentedState<S> {
    fn dof(&self) -> usize {
        3 * S::DOF + self.featuresk.len() + self.featuresk_l.len()
    }

    fn boxplus(&self, delta: &[f64]) -> Self {
        let n = S::DOF;
        let f = Self::features_offset();
        let nk = self.featuresk.len();
        Self {
            statek: self.statek.boxplus(&delta[Epoch::K.offset(n)..]),
            statek_l: self.statek_l.boxplus(&delta[Epoch::KL.offset(n)..]),
            statek_i: self.statek_i.boxplus(&delta[Epoch::KI.offset(n)..]),
            featuresk: self.featuresk.boxplus(&delta[f..]),
            featuresk_l: self.featuresk_l.boxplus(&delta[f + nk..]),
        }
    }

    fn boxminus(&self, other: &Self) -> DVector<f64> {
        let n = S::DOF;
        let f = Self::features_offset();
        let nk = self.featuresk.len();
        let mut d = DVector::zeros(self.dof());
        for epoch in Epoch::ALL {
            d.rows_mut(epoch.offset(n), n)
                .copy_from(&self.epoch(epoch).boxminus(other.epoch(epoch)));
        }
        d.rows_mut(f, nk)
            .copy_from(&self.featuresk.boxminus(&other.featuresk));
        d.rows_mut(f + nk, self.featuresk_l.len())
            .copy_from(&self.featuresk_l.boxminus(&other.featuresk_l));
        d
    }

    fn vectorized(&self) -> DVector<f64> {
        let n = S::DOF;
        let f = Self::features_offset();
        let nk = self.featuresk.len();
        let mut v = DVector::zeros(self.dof());
        for epoch in Epoch::ALL {
            v.rows_mut(epoch.offset(n), n)
                .copy_from(&self.epoch(epoch).vectorized());
        }
        v.rows_mut(f, nk).copy_from(&self.featuresk);
        v.rows_mut(f + nk, self.featuresk_l.len())
            .copy_from(&self.featuresk_l);
        v
    }

    fn set_vectorized(&mut self, v: &[f64]) {
        let n = S::DOF;
        let f = Self::features_offset();
        let nk = self.featuresk.len();
        for epoch in Epoch::ALL {
            self.epoch_mut(epoch).set_vectorized(&v[epoch.offset(n)..]);
        }
        self.featuresk.set_vectorized(&v[f..]);
        self.featuresk_l.set_vectorized(&v[f + nk..]);
    }
}
