// proprio_core/src/error.rs

use thiserror::Error;

/// Failures the estimation core reports instead of aborting.
///
/// Gate rejections are not errors; they surface as
/// [`UpdateOutcome::Rejected`](crate::estimation::UpdateOutcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A covariance handed to a Cholesky factorization was not SPD.
    #[error("{context}: covariance is not positive definite")]
    NotPositiveDefinite { context: &'static str },

    /// The iterative manifold mean hit its iteration cap.
    #[error("sigma point mean did not converge after {iterations} iterations (|delta| = {residual:e})")]
    MeanNotConverged { iterations: usize, residual: f64 },

    /// A matrix that had to be inverted was singular.
    #[error("{context}: matrix is singular")]
    SingularMatrix { context: &'static str },

    /// An SVD or eigen decomposition failed to produce its factors.
    #[error("{context}: decomposition failed")]
    DecompositionFailed { context: &'static str },

    #[error("{context}: expected dimension {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `predict`/`update` was called before the attitude was set.
    #[error("attitude has not been initialized")]
    AttitudeNotInitialized,
}
