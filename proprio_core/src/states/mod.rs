// proprio_core/src/states/mod.rs

use crate::math::manifold::Manifold;

pub mod augmented;
pub mod layout;
pub mod single;

pub use augmented::AugmentedState;
pub use layout::{epoch_block, set_epoch_block, Epoch, ErrorBlock};
pub use single::SingleState;

/// A single-epoch state that can act as its own error state.
///
/// The USCKF keeps one instance as the nominal state and one as the error; after a
/// correction the error is folded into the nominal with [`ErrorState::inject_into`]
/// and zeroed again with [`ErrorState::reset`].
pub trait ErrorState: Manifold + Default + PartialEq {
    /// Degrees of freedom of one epoch.
    const DOF: usize;

    /// Folds this error into `nominal`: additive on vector parts, multiplicative and
    /// renormalized on orientations.
    fn inject_into(&self, nominal: &mut Self);

    /// Zero vectors, identity orientation.
    fn reset(&mut self) {
        *self = Self::default();
    }
}
