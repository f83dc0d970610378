// proprio_core/src/estimation/mod.rs

use nalgebra::{DMatrix, DVector};

pub mod ekf;
pub mod filters;
pub mod gating;
pub mod sigma_points;

/// What happened to a measurement handed to an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The correction was applied to the state and covariance.
    Applied,
    /// The significance test rejected the measurement; nothing changed.
    Rejected {
        /// The innovation that failed the gate.
        innovation: DVector<f64>,
    },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Source of the discrete process noise for one prediction step.
///
/// A plain matrix is its own source; closures are wrapped in [`NoiseFn`].
pub trait ProcessNoise {
    fn covariance(&self) -> DMatrix<f64>;
}

impl ProcessNoise for DMatrix<f64> {
    fn covariance(&self) -> DMatrix<f64> {
        self.clone()
    }
}

/// Adapts a closure producing `Q` to [`ProcessNoise`].
pub struct NoiseFn<F>(pub F);

impl<F: Fn() -> DMatrix<f64>> ProcessNoise for NoiseFn<F> {
    fn covariance(&self) -> DMatrix<f64> {
        (self.0)()
    }
}
