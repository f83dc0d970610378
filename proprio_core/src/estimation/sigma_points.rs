// proprio_core/src/estimation/sigma_points.rs

//! Unscaled symmetric sigma points on a manifold.
//!
//! `2n+1` points are placed at the mean and at `mean ⊞ ±Lⱼ` for the columns of the
//! Cholesky factor `L` of the covariance. With that spread the sample covariance of
//! the points is recovered as `0.5 Σ dᵢdᵢᵀ`.

use nalgebra::{Cholesky, DMatrix, DVector};
use tracing::error;

use crate::config::UsckfConfig;
use crate::error::FilterError;
use crate::math::manifold::Manifold;

/// Generates the `2n+1` sigma points of `(mean, cov)`.
pub fn generate<M: Manifold>(mean: &M, cov: &DMatrix<f64>) -> Result<Vec<M>, FilterError> {
    let n = mean.dof();
    if cov.nrows() != n || cov.ncols() != n {
        return Err(FilterError::DimensionMismatch {
            context: "sigma point covariance",
            expected: n,
            actual: cov.nrows(),
        });
    }

    // Cholesky decomposition: P = L * L^T
    let l = Cholesky::new(cov.clone())
        .ok_or(FilterError::NotPositiveDefinite {
            context: "sigma point generation",
        })?
        .l();

    let mut points = Vec::with_capacity(2 * n + 1);
    points.push(mean.clone());
    for j in 0..n {
        let col: DVector<f64> = l.column(j).into_owned();
        let neg = -&col;
        points.push(mean.boxplus(col.as_slice()));
        points.push(mean.boxplus(neg.as_slice()));
    }
    Ok(points)
}

/// Fixed-point mean on the manifold.
///
/// Starting from the first point, the average tangent displacement of all points is
/// applied until its norm drops below `config.mean_tolerance`.
pub fn manifold_mean<M: Manifold>(points: &[M], config: &UsckfConfig) -> Result<M, FilterError> {
    let first = points.first().ok_or(FilterError::DimensionMismatch {
        context: "sigma point mean",
        expected: 1,
        actual: 0,
    })?;

    let mut reference = first.clone();
    let count = points.len() as f64;
    let mut iterations = 0;
    loop {
        let mut mean_delta = DVector::zeros(reference.dof());
        for p in points {
            mean_delta += p.boxminus(&reference);
        }
        mean_delta /= count;
        reference.boxplus_assign(mean_delta.as_slice());
        iterations += 1;

        let residual = mean_delta.norm();
        if residual <= config.mean_tolerance {
            return Ok(reference);
        }
        if iterations >= config.mean_max_iterations {
            error!(iterations, residual, "sigma point mean did not converge");
            return Err(FilterError::MeanNotConverged {
                iterations,
                residual,
            });
        }
    }
}

/// Arithmetic mean of measurement sigma points.
pub fn vector_mean(points: &[DVector<f64>]) -> DVector<f64> {
    let dim = points.first().map_or(0, |p| p.len());
    let sum = points
        .iter()
        .fold(DVector::zeros(dim), |acc: DVector<f64>, p| acc + p);
    sum / points.len().max(1) as f64
}

/// `0.5 Σ (Xᵢ ⊟ mean)(Xᵢ ⊟ mean)ᵀ`.
pub fn covariance<M: Manifold>(mean: &M, points: &[M]) -> DMatrix<f64> {
    let n = mean.dof();
    let mut c = DMatrix::zeros(n, n);
    for p in points {
        let d = p.boxminus(mean);
        c += &d * d.transpose();
    }
    c * 0.5
}

/// `0.5 Σ (Xᵢ ⊟ mean_x)(Zᵢ ⊟ mean_z)ᵀ`.
pub fn cross_covariance<X: Manifold, Z: Manifold>(
    mean_x: &X,
    mean_z: &Z,
    xs: &[X],
    zs: &[Z],
) -> DMatrix<f64> {
    let mut c = DMatrix::zeros(mean_x.dof(), mean_z.dof());
    for (x, z) in xs.iter().zip(zs) {
        c += x.boxminus(mean_x) * z.boxminus(mean_z).transpose();
    }
    c * 0.5
}
