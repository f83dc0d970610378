// proprio_core/src/models/estimation/dynamics/strapdown.rs

use nalgebra::{Matrix3, Vector3};

use crate::config::SckfNoise;
use crate::math::quaternion::{quaternion_to_dcm, skew};
use crate::messages::ImuSample;
use crate::models::estimation::dynamics::ErrorDynamics;
use crate::states::{ErrorBlock, SingleState};
use crate::types::{Matrix15, Matrix9};

/// Bias-corrected inputs of one strapdown step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedInputs {
    /// Navigation-to-body direction cosine matrix of the nominal orientation.
    pub cq: Matrix3<f64>,
    /// Reference gravity seen in the body frame.
    pub gravity_body: Vector3<f64>,
    /// Gyro sample minus gyro bias.
    pub angular_velocity: Vector3<f64>,
    /// Accelerometer sample minus accel bias minus body gravity.
    pub linear_acceleration: Vector3<f64>,
}

/// Error-state dynamics of a strapdown inertial system with gyro and accel biases.
///
/// The attitude error is the vector part of the error quaternion, hence the `-0.5`
/// coupling between attitude and gyro bias.
#[derive(Debug, Clone)]
pub struct StrapdownErrorModel {
    /// Reference gravity in the navigation frame (z up, as sensed by an accelerometer at rest).
    pub gravity: Vector3<f64>,
    pub noise: SckfNoise,
}

impl StrapdownErrorModel {
    pub fn new(gravity_magnitude: f64, noise: SckfNoise) -> Self {
        Self {
            gravity: Vector3::new(0.0, 0.0, gravity_magnitude),
            noise,
        }
    }

    pub fn corrected_inputs(&self, nominal: &SingleState, imu: &ImuSample) -> CorrectedInputs {
        let cq = quaternion_to_dcm(&nominal.orient);
        let gravity_body = cq * self.gravity;
        CorrectedInputs {
            cq,
            gravity_body,
            angular_velocity: imu.gyro - nominal.gbias,
            linear_acceleration: imu.accel - nominal.abias - gravity_body,
        }
    }
}

/// Builds the continuous-time error Jacobian from corrected inputs.
pub fn error_state_jacobian(inputs: &CorrectedInputs) -> Matrix15 {
    let vel = ErrorBlock::Velocity.offset();
    let att = ErrorBlock::Attitude.offset();

    // Attitude sub-system over (att, gyro bias, accel bias).
    let mut a = Matrix9::zeros();
    a.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&(-skew(&inputs.angular_velocity)));
    a[(0, 3)] = -0.5;
    a[(1, 4)] = -0.5;
    a[(2, 5)] = -0.5;

    let cq_t = inputs.cq.transpose();
    let mut f = Matrix15::zeros();
    f.fixed_view_mut::<3, 3>(ErrorBlock::Position.offset(), vel)
        .copy_from(&Matrix3::identity());
    f.fixed_view_mut::<3, 3>(vel, att)
        .copy_from(&(-cq_t * skew(&inputs.linear_acceleration)));
    f.fixed_view_mut::<3, 3>(vel, ErrorBlock::AccelBias.offset())
        .copy_from(&(-cq_t));
    f.fixed_view_mut::<9, 9>(att, att).copy_from(&a);
    f
}

impl ErrorDynamics for StrapdownErrorModel {
    fn error_jacobian(&self, nominal: &SingleState, imu: &ImuSample) -> Matrix15 {
        error_state_jacobian(&self.corrected_inputs(nominal, imu))
    }

    fn process_noise(&self, nominal: &SingleState, dt: f64) -> Matrix15 {
        let cq = quaternion_to_dcm(&nominal.orient);
        let n = &self.noise;

        let mut q = Matrix15::zeros();
        let blocks = [
            (ErrorBlock::Position, n.ra * dt),
            (ErrorBlock::Velocity, cq.transpose() * n.ra),
            (ErrorBlock::Attitude, n.rg * 0.25),
            (ErrorBlock::GyroBias, n.qbg),
            (ErrorBlock::AccelBias, n.qba),
        ];
        for (block, value) in blocks {
            q.fixed_view_mut::<3, 3>(block.offset(), block.offset())
                .copy_from(&value);
        }
        q
    }
}
