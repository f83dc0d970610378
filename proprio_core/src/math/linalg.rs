// proprio_core/src/math/linalg.rs

use nalgebra::allocator::Allocator;
use nalgebra::{Cholesky, DMatrix, DVector, DefaultAllocator, Dim, OMatrix};

use crate::error::FilterError;

/// Inverse of a symmetric positive definite matrix through its Cholesky factor.
///
/// Every matrix the filters invert (innovation covariances, prior covariances,
/// information matrices) is SPD by construction, so a failed factorization is
/// reported as a singular matrix.
pub fn spd_inverse<D>(
    m: OMatrix<f64, D, D>,
    context: &'static str,
) -> Result<OMatrix<f64, D, D>, FilterError>
where
    D: Dim,
    DefaultAllocator: Allocator<D, D>,
{
    Cholesky::new(m)
        .map(|chol| chol.inverse())
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
        .ok_or(FilterError::SingularMatrix { context })
}

/// Solves `a * x = b` for SPD `a`.
pub fn spd_solve(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    context: &'static str,
) -> Result<DMatrix<f64>, FilterError> {
    let chol = Cholesky::new(a.clone()).ok_or(FilterError::SingularMatrix { context })?;
    let x = chol.solve(b);
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FilterError::SingularMatrix { context })
    }
}

/// `xᵀ m x`.
pub fn quadratic_form(x: &DVector<f64>, m: &DMatrix<f64>) -> f64 {
    (x.transpose() * m * x)[(0, 0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    #[test]
    fn test_spd_inverse_fixed_size() {
        let m = Matrix3::new(4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0);
        let inv = spd_inverse(m, "test").unwrap();

        assert_relative_eq!(m * inv, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_spd_inverse_reports_singular() {
        let m = -DMatrix::<f64>::identity(2, 2);
        assert_eq!(
            spd_inverse(m, "negative"),
            Err(FilterError::SingularMatrix { context: "negative" })
        );
    }

    #[test]
    fn test_spd_solve() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let b = DMatrix::from_row_slice(2, 1, &[2.0, 2.0]);
        let x = spd_solve(&a, &b, "test").unwrap();

        assert_relative_eq!(x[(0, 0)], 1.0);
        assert_relative_eq!(x[(1, 0)], 0.5);
    }
}
