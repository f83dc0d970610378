// proprio_core/src/estimation/ekf.rs

use nalgebra::{DMatrix, DVector};

use crate::error::FilterError;
use crate::math::linalg::{quadratic_form, spd_inverse};

/// A container for the inputs of one linear measurement update.
pub struct EkfMeasurementParams<'a> {
    pub z: &'a DVector<f64>,
    pub h: &'a DMatrix<f64>,
    pub r: &'a DMatrix<f64>,
}

/// A corrected estimate together with the statistics needed to gate it.
#[derive(Debug, Clone)]
pub struct EkfCorrection {
    pub x: DVector<f64>,
    pub p: DMatrix<f64>,
    pub innovation: DVector<f64>,
    pub mahalanobis2: f64,
}

/// PURE FUNCTION: Performs one linear prediction step.
/// Returns `(F x, F P Fᵀ + Q)`.
pub fn ekf_predict(
    x: &DVector<f64>,
    p: &DMatrix<f64>,
    f: &DMatrix<f64>,
    q: &DMatrix<f64>,
) -> (DVector<f64>, DMatrix<f64>) {
    (f * x, f * p * f.transpose() + q)
}

/// PURE FUNCTION: Performs one linear measurement update with the Joseph-form
/// covariance `(I − KH) P (I − KH)ᵀ + K R Kᵀ`, symmetrized.
///
/// The caller decides whether to keep the correction, usually from `mahalanobis2`.
pub fn ekf_update(
    x: &DVector<f64>,
    p: &DMatrix<f64>,
    params: &EkfMeasurementParams,
) -> Result<EkfCorrection, FilterError> {
    let n = x.len();
    let m = params.z.len();
    if params.h.nrows() != m || params.h.ncols() != n {
        return Err(FilterError::DimensionMismatch {
            context: "observation matrix",
            expected: m * n,
            actual: params.h.nrows() * params.h.ncols(),
        });
    }
    if params.r.nrows() != m || params.r.ncols() != m {
        return Err(FilterError::DimensionMismatch {
            context: "measurement noise",
            expected: m,
            actual: params.r.nrows(),
        });
    }

    let h = params.h;
    let r = params.r;

    let s = h * p * h.transpose() + r;
    let s_inv = spd_inverse(s, "innovation covariance")?;
    let k_gain = p * h.transpose() * &s_inv;

    let innovation = params.z - h * x;
    let mahalanobis2 = quadratic_form(&innovation, &s_inv);

    let new_x = x + &k_gain * &innovation;
    let i_kh = DMatrix::<f64>::identity(n, n) - &k_gain * h;
    let new_p = &i_kh * p * i_kh.transpose() + &k_gain * r * k_gain.transpose();

    Ok(EkfCorrection {
        x: new_x,
        p: (&new_p + new_p.transpose()) * 0.5,
        innovation,
        mahalanobis2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_update() {
        let x = DVector::from_vec(vec![0.0]);
        let p = DMatrix::from_element(1, 1, 1.0);
        let z = DVector::from_vec(vec![2.0]);
        let h = DMatrix::from_element(1, 1, 1.0);
        let r = DMatrix::from_element(1, 1, 1.0);

        let c = ekf_update(&x, &p, &EkfMeasurementParams { z: &z, h: &h, r: &r }).unwrap();

        assert_relative_eq!(c.x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.p[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.mahalanobis2, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_predict() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let p = DMatrix::identity(2, 2);
        let f = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        let q = DMatrix::identity(2, 2) * 0.1;

        let (x, p) = ekf_predict(&x, &p, &f, &q);

        assert_relative_eq!(x, DVector::from_vec(vec![2.0, 2.0]));
        assert_relative_eq!(p, DMatrix::from_row_slice(2, 2, &[1.35, 0.5, 0.5, 1.1]), epsilon = 1e-12);
    }

    #[test]
    fn test_bad_observation_shape() {
        let x = DVector::zeros(3);
        let p = DMatrix::identity(3, 3);
        let z = DVector::zeros(2);
        let h = DMatrix::zeros(2, 4);
        let r = DMatrix::identity(2, 2);

        assert!(ekf_update(&x, &p, &EkfMeasurementParams { z: &z, h: &h, r: &r }).is_err());
    }
}
