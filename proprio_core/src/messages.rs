// proprio_core/src/messages.rs

use nalgebra::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};

use crate::error::FilterError;
use crate::types::NUMAXIS;

// =========================================================================
// == Sensor Data Structures ==
// =========================================================================

/// One inertial sample in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub timestamp: f64,
    /// Angular velocity in rad/s.
    pub gyro: Vector3<f64>,
    /// Specific force in m/s^2.
    pub accel: Vector3<f64>,
    /// Magnetic field, any consistent unit.
    pub mag: Vector3<f64>,
}

/// Velocity-error measurement produced by the kinematic chain of the robot.
///
/// The kinematics are solved elsewhere; this is the linear model they hand over:
/// `hme` (3 x n) maps the `n`-dimensional `slip_error` into a body velocity error,
/// and `rme` (n x n) is the noise of `slip_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicMeasurement {
    hme: DMatrix<f64>,
    rme: DMatrix<f64>,
    slip_error: DVector<f64>,
}

impl KinematicMeasurement {
    pub fn new(
        hme: DMatrix<f64>,
        rme: DMatrix<f64>,
        slip_error: DVector<f64>,
    ) -> Result<Self, FilterError> {
        let n = slip_error.len();
        if hme.nrows() != NUMAXIS {
            return Err(FilterError::DimensionMismatch {
                context: "kinematic Hme rows",
                expected: NUMAXIS,
                actual: hme.nrows(),
            });
        }
        if hme.ncols() != n {
            return Err(FilterError::DimensionMismatch {
                context: "kinematic Hme columns",
                expected: n,
                actual: hme.ncols(),
            });
        }
        if rme.nrows() != n || rme.ncols() != n {
            return Err(FilterError::DimensionMismatch {
                context: "kinematic Rme",
                expected: n,
                actual: rme.nrows(),
            });
        }
        Ok(Self {
            hme,
            rme,
            slip_error,
        })
    }

    /// A direct body-velocity error observation with isotropic noise.
    pub fn from_velocity_error(velocity_error: Vector3<f64>, noise_std: f64) -> Self {
        Self {
            hme: DMatrix::identity(NUMAXIS, NUMAXIS),
            rme: DMatrix::identity(NUMAXIS, NUMAXIS) * noise_std.powi(2),
            slip_error: DVector::from_column_slice(velocity_error.as_slice()),
        }
    }

    pub fn hme(&self) -> &DMatrix<f64> {
        &self.hme
    }

    pub fn rme(&self) -> &DMatrix<f64> {
        &self.rme
    }

    pub fn slip_error(&self) -> &DVector<f64> {
        &self.slip_error
    }

    /// `Hme * slip_error`.
    pub fn velocity_error(&self) -> Vector3<f64> {
        let v = &self.hme * &self.slip_error;
        Vector3::new(v[0], v[1], v[2])
    }

    /// `Hme * Rme * Hmeᵀ`.
    pub fn velocity_noise(&self) -> Matrix3<f64> {
        let r = &self.hme * &self.rme * self.hme.transpose();
        r.fixed_view::<3, 3>(0, 0).into_owned()
    }
}

// =========================================================================
// == Public API Messages ==
// =========================================================================

/// Snapshot of an attitude estimator, for logging and downstream consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeOutput {
    pub timestamp: f64,
    pub orientation: UnitQuaternion<f64>,
    pub gyro_bias: Vector3<f64>,
    pub accel_bias: Vector3<f64>,
    /// Whether the adaptive estimator is currently inflating the gravity noise.
    pub external_acceleration: bool,
}
