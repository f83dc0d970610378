// proprio_core/src/models/estimation/measurement/data_model.rs

use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::ops::Add;
use tracing::warn;

use crate::error::FilterError;
use crate::math::linalg::spd_inverse;

/// A Gaussian estimate of a measurement-level quantity (slip vector, contact angles,
/// a velocity) that several sources may report independently.
#[derive(Debug, Clone, PartialEq)]
pub struct DataModel {
    pub data: DVector<f64>,
    pub cov: DMatrix<f64>,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::with_dim(1)
    }
}

impl DataModel {
    /// Zero estimate with identity covariance.
    pub fn with_dim(dim: usize) -> Self {
        Self {
            data: DVector::zeros(dim),
            cov: DMatrix::identity(dim, dim),
        }
    }

    pub fn new(data: DVector<f64>, cov: DMatrix<f64>) -> Result<Self, FilterError> {
        if cov.nrows() != data.len() || cov.ncols() != data.len() {
            return Err(FilterError::DimensionMismatch {
                context: "data model covariance",
                expected: data.len(),
                actual: cov.nrows(),
            });
        }
        Ok(Self { data, cov })
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// Information-form fusion of two independent estimates:
    /// `P = (P1⁻¹ + P2⁻¹)⁻¹`, `x = P (P1⁻¹ x1 + P2⁻¹ x2)`.
    pub fn fuse(&self, other: &DataModel) -> Result<DataModel, FilterError> {
        if self.dim() == 0 || self.dim() != other.dim() {
            return Err(FilterError::DimensionMismatch {
                context: "data model fusion",
                expected: self.dim(),
                actual: other.dim(),
            });
        }

        let info_self = spd_inverse(self.cov.clone(), "data model covariance")?;
        let info_other = spd_inverse(other.cov.clone(), "data model covariance")?;
        let cov = spd_inverse(&info_self + &info_other, "fused information")?;
        let data = &cov * (info_self * &self.data + info_other * &other.data);

        Ok(DataModel { data, cov })
    }
}

/// Operator form of [`DataModel::fuse`]. When the operands cannot be fused the
/// right-hand operand is returned unchanged.
impl Add<&DataModel> for &DataModel {
    type Output = DataModel;

    fn add(self, rhs: &DataModel) -> DataModel {
        match self.fuse(rhs) {
            Ok(fused) => fused,
            Err(err) => {
                warn!(%err, "data model fusion skipped");
                rhs.clone()
            }
        }
    }
}

impl Add for DataModel {
    type Output = DataModel;

    fn add(self, rhs: DataModel) -> DataModel {
        &self + &rhs
    }
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.data, self.cov)
    }
}
