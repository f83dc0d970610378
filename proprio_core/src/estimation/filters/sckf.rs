// proprio_core/src/estimation/filters/sckf.rs

use nalgebra::{Matrix3, Matrix4, Matrix6, UnitQuaternion, Vector3, Vector6};
use tracing::{debug, trace};

use crate::config::SckfConfig;
use crate::error::FilterError;
use crate::math::linalg::spd_inverse;
use crate::math::quaternion::{
    euler_zyx, from_error_vector, from_euler_zyx, from_wxyz, omega_matrix, skew, to_wxyz,
};
use crate::messages::{AttitudeOutput, ImuSample, KinematicMeasurement};
use crate::models::estimation::dynamics::strapdown::{error_state_jacobian, StrapdownErrorModel};
use crate::models::estimation::dynamics::{discretize_noise, discretize_transition, ErrorDynamics};
use crate::models::estimation::measurement::adaptive::AdaptiveAttitudeCov;
use crate::models::estimation::measurement::magnetometer::magnetic_reference;
use crate::states::{ErrorBlock, SingleState};
use crate::types::{
    Matrix15, Matrix15x6, Matrix3x9, Matrix6x15, Matrix9, Matrix9x6, Vector15, Vector9,
    ATTITUDE_ERROR_DIM,
};

/// Indirect Kalman filter fusing inertial propagation with kinematic velocity
/// errors and an adaptive gravity-based attitude measurement.
///
/// The error state is `[δp, δv, δθ, δbg, δba]`. Orientation and biases are kept
/// as nominal values outside of it and corrected after every update.
#[derive(Debug, Clone)]
pub struct Sckf {
    /// Error state vector.
    x: Vector15,
    /// Error state covariance.
    p: Matrix15,
    /// Gain of the last update.
    k: Matrix15x6,
    /// Innovation of the last update.
    innovation: Vector6<f64>,

    /// Nominal orientation, body to navigation. `None` until set by the caller.
    attitude: Option<UnitQuaternion<f64>>,
    /// Quaternion kinematics matrix of the previous step.
    old_omega: Matrix4<f64>,
    gyro_bias: Vector3<f64>,
    accel_bias: Vector3<f64>,
    /// Reference magnetic field in the navigation frame.
    mtilde: Vector3<f64>,

    dynamics: StrapdownErrorModel,
    adaptive: AdaptiveAttitudeCov,
}

impl Sckf {
    pub fn new(config: SckfConfig) -> Self {
        Self {
            x: Vector15::zeros(),
            p: config.p0,
            k: Matrix15x6::zeros(),
            innovation: Vector6::zeros(),
            attitude: None,
            old_omega: Matrix4::zeros(),
            gyro_bias: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            mtilde: magnetic_reference(config.dip_angle),
            dynamics: StrapdownErrorModel::new(config.gravity, config.noise),
            adaptive: AdaptiveAttitudeCov::new(config.adaptive),
        }
    }

    fn orientation(&self) -> Result<UnitQuaternion<f64>, FilterError> {
        self.attitude.ok_or(FilterError::AttitudeNotInitialized)
    }

    fn nominal(&self, orient: UnitQuaternion<f64>) -> SingleState {
        SingleState {
            orient,
            gbias: self.gyro_bias,
            abias: self.accel_bias,
            ..SingleState::default()
        }
    }

    // --- Prediction ---

    /// Propagates the error state, its covariance and the nominal orientation.
    ///
    /// # Arguments
    /// * `gyro`: Raw angular velocity in rad/s.
    /// * `acc`: Raw specific force in m/s^2.
    /// * `dt`: Step length in seconds. Non-positive steps are ignored.
    pub fn predict(
        &mut self,
        gyro: &Vector3<f64>,
        acc: &Vector3<f64>,
        dt: f64,
    ) -> Result<(), FilterError> {
        let orient = self.orientation()?;
        if dt <= 0.0 {
            return Ok(());
        }

        let nominal = self.nominal(orient);
        let imu = ImuSample {
            timestamp: 0.0,
            gyro: *gyro,
            accel: *acc,
            mag: Vector3::zeros(),
        };

        // --- 1. Linearize around the bias-corrected inputs ---
        let inputs = self.dynamics.corrected_inputs(&nominal, &imu);
        let f = error_state_jacobian(&inputs);

        // --- 2. Propagate the error state and its covariance ---
        let phi = discretize_transition(&f, dt);
        self.x = phi * self.x;

        let qd = discretize_noise(&f, &self.dynamics.process_noise(&nominal, dt), dt);
        let p = phi * self.p * phi.transpose() + qd;
        self.p = (p + p.transpose()) * 0.5;

        // --- 3. Integrate the nominal quaternion ---
        let w = inputs.angular_velocity;
        let w2 = w.norm_squared();
        let omega = omega_matrix(&w);
        let integrator = Matrix4::identity() + omega * (0.75 * dt) - self.old_omega * (0.25 * dt)
            - Matrix4::identity() * (w2 * dt * dt / 6.0)
            - omega * self.old_omega * (dt * dt / 24.0)
            - omega * (w2 * dt.powi(3) / 48.0);

        self.attitude = Some(from_wxyz(&(integrator * to_wxyz(&orient))));
        self.old_omega = omega;

        trace!(dt, "sckf predicted");
        Ok(())
    }

    // --- Correction ---

    /// Fuses the kinematic velocity error and the gravity measurement.
    ///
    /// `mag` and `magnetometer_enabled` are accepted for interface stability; the
    /// magnetometer is not part of the fused measurement.
    pub fn update(
        &mut self,
        kinematics: &KinematicMeasurement,
        acc: &Vector3<f64>,
        mag: &Vector3<f64>,
        dt: f64,
        magnetometer_enabled: bool,
    ) -> Result<(), FilterError> {
        let orient = self.orientation()?;
        let nominal = self.nominal(orient);
        let att = ErrorBlock::Attitude.offset();

        if magnetometer_enabled {
            debug!(?mag, "magnetometer sample not fused");
        }

        // --- 1. Gravity measurement of the attitude sub-state ---
        let inputs = self.dynamics.corrected_inputs(&nominal, &ImuSample {
            timestamp: 0.0,
            gyro: Vector3::zeros(),
            accel: *acc,
            mag: *mag,
        });
        let z1a = inputs.linear_acceleration;

        let mut h1a = Matrix3x9::zeros();
        h1a.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(skew(&inputs.gravity_body) * 2.0));
        h1a.fixed_view_mut::<3, 3>(0, 6)
            .copy_from(&Matrix3::identity());

        let xa: Vector9 = self.x.fixed_rows::<ATTITUDE_ERROR_DIM>(att).into_owned();
        let p1a: Matrix9 = self
            .p
            .fixed_view::<ATTITUDE_ERROR_DIM, ATTITUDE_ERROR_DIM>(att, att)
            .into_owned();

        // --- 2. Adaptive inflation of the gravity noise ---
        let noise = self.dynamics.noise;
        let qstar = self.adaptive.matrix(&xa, &p1a, &z1a, &h1a, &noise.ra)?;
        trace!(dt, inflating = self.adaptive.is_inflating(), "sckf adaptive step");

        // --- 3. Stack the measurement ---
        let velocity_error = kinematics.velocity_error();
        let z = Vector6::new(
            velocity_error.x,
            velocity_error.y,
            velocity_error.z,
            z1a.x,
            z1a.y,
            z1a.z,
        );

        let mut h = Matrix6x15::zeros();
        h.fixed_view_mut::<3, 3>(0, ErrorBlock::Velocity.offset())
            .copy_from(&inputs.cq);
        h.fixed_view_mut::<3, ATTITUDE_ERROR_DIM>(3, att)
            .copy_from(&h1a);

        let mut r = Matrix6::zeros();
        r.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&kinematics.velocity_noise());
        r.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(noise.ra + noise.rat + qstar));

        // --- 4. Kalman gain and Joseph-form update ---
        let s = h * self.p * h.transpose() + r;
        let s_inv = spd_inverse(s, "sckf innovation covariance")?;
        self.k = self.p * h.transpose() * s_inv;

        self.innovation = z - h * self.x;
        self.x += self.k * self.innovation;

        let i_kh = Matrix15::identity() - self.k * h;
        let p = i_kh * self.p * i_kh.transpose() + self.k * r * self.k.transpose();
        self.p = (p + p.transpose()) * 0.5;

        // --- 5. Inject the correction, leaving yaw untouched ---
        let error_quat = from_error_vector(&self.x.fixed_rows::<3>(att).into_owned());
        let error_euler = euler_zyx(&error_quat);
        let qe = from_euler_zyx(error_euler.x, error_euler.y, 0.0);
        self.attitude = Some(UnitQuaternion::new_normalize((orient * qe).into_inner()));

        self.gyro_bias += self.x.fixed_rows::<3>(ErrorBlock::GyroBias.offset());
        self.accel_bias += self.x.fixed_rows::<3>(ErrorBlock::AccelBias.offset());

        Ok(())
    }

    /// Zeroes the attitude, gyro bias and accel bias blocks of the error state.
    pub fn reset_state_vector(&mut self) {
        self.x
            .rows_mut(ErrorBlock::Attitude.offset(), ATTITUDE_ERROR_DIM)
            .fill(0.0);
    }

    // --- Accessors ---

    pub fn state_x(&self) -> &Vector15 {
        &self.x
    }

    pub fn covariance_x(&self) -> &Matrix15 {
        &self.p
    }

    /// Covariance of the attitude sub-state `[δθ, δbg, δba]`.
    pub fn covariance_attitude(&self) -> Matrix9 {
        let att = ErrorBlock::Attitude.offset();
        self.p
            .fixed_view::<ATTITUDE_ERROR_DIM, ATTITUDE_ERROR_DIM>(att, att)
            .into_owned()
    }

    pub fn kalman_gain(&self) -> &Matrix15x6 {
        &self.k
    }

    /// Rows of the gain acting on the attitude sub-state.
    ///
    /// The 9×6 block at rows 6..15 (`δθ`, `δbg`, `δba`) over all six measurement columns.
    pub fn attitude_kalman_gain(&self) -> Matrix9x6 {
        self.k
            .fixed_rows::<ATTITUDE_ERROR_DIM>(ErrorBlock::Attitude.offset())
            .into_owned()
    }

    pub fn innovation(&self) -> &Vector6<f64> {
        &self.innovation
    }

    pub fn attitude(&self) -> Option<UnitQuaternion<f64>> {
        self.attitude
    }

    /// `[roll, pitch, yaw]` of the nominal orientation.
    pub fn euler(&self) -> Option<Vector3<f64>> {
        self.attitude.as_ref().map(euler_zyx)
    }

    pub fn gravity(&self) -> Vector3<f64> {
        self.dynamics.gravity
    }

    pub fn magnetic_reference(&self) -> &Vector3<f64> {
        &self.mtilde
    }

    pub fn gyro_bias(&self) -> &Vector3<f64> {
        &self.gyro_bias
    }

    pub fn accel_bias(&self) -> &Vector3<f64> {
        &self.accel_bias
    }

    pub fn adaptive(&self) -> &AdaptiveAttitudeCov {
        &self.adaptive
    }

    /// Snapshot for downstream consumers.
    pub fn output(&self, timestamp: f64) -> Result<AttitudeOutput, FilterError> {
        Ok(AttitudeOutput {
            timestamp,
            orientation: self.orientation()?,
            gyro_bias: self.gyro_bias,
            accel_bias: self.accel_bias,
            external_acceleration: self.adaptive.is_inflating(),
        })
    }

    // --- Setters ---

    pub fn set_attitude(&mut self, attitude: UnitQuaternion<f64>) {
        self.attitude = Some(attitude);
    }

    /// Sets the local gravity magnitude.
    pub fn set_gravity(&mut self, gravity: f64) {
        self.dynamics.gravity = Vector3::new(0.0, 0.0, gravity);
    }

    /// Seeds the previous-step quaternion kinematics matrix from a gyro sample.
    pub fn set_omega(&mut self, gyro: &Vector3<f64>) {
        self.old_omega = omega_matrix(gyro);
    }

    pub fn set_state_x(&mut self, x: Vector15) {
        self.x = x;
    }

    /// Replaces the yaw of the nominal orientation, keeping roll and pitch.
    pub fn set_heading(&mut self, yaw: f64) -> Result<(), FilterError> {
        let euler = euler_zyx(&self.orientation()?);
        self.attitude = Some(from_euler_zyx(euler.x, euler.y, yaw));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const G: f64 = 9.81;
    const DT: f64 = 0.01;

    fn level_filter() -> Sckf {
        let mut filter = Sckf::new(SckfConfig::default());
        filter.set_attitude(UnitQuaternion::identity());
        filter
    }

    fn still() -> KinematicMeasurement {
        KinematicMeasurement::from_velocity_error(Vector3::zeros(), 0.01)
    }

    fn step(filter: &mut Sckf, gyro: Vector3<f64>, acc: Vector3<f64>) {
        filter.predict(&gyro, &acc, DT).unwrap();
        filter
            .update(&still(), &acc, &Vector3::zeros(), DT, false)
            .unwrap();
        filter.reset_state_vector();
    }

    #[test]
    fn test_stationary_run_holds_identity() {
        let mut filter = level_filter();
        for _ in 0..100 {
            step(&mut filter, Vector3::zeros(), Vector3::new(0.0, 0.0, G));
        }

        let q = filter.attitude().unwrap();
        assert!(q.angle_to(&UnitQuaternion::identity()) < 1e-6);
        assert_eq!(filter.state_x().fixed_rows::<6>(0).into_owned(), nalgebra::Vector6::zeros());
        assert!(!filter.adaptive().is_inflating());
    }

    #[test]
    fn test_predict_only_stationary_run() {
        let mut filter = level_filter();
        for _ in 0..100 {
            filter
                .predict(&Vector3::zeros(), &Vector3::new(0.0, 0.0, G), DT)
                .unwrap();
        }

        let q = filter.attitude().unwrap();
        assert!(q.angle_to(&UnitQuaternion::identity()) < 1e-6);
        assert_eq!(filter.state_x().fixed_rows::<6>(0).into_owned(), nalgebra::Vector6::zeros());
        let p = filter.covariance_x();
        assert_relative_eq!(*p, p.transpose(), epsilon = 1e-15);
    }

    #[test]
    fn test_quaternion_stays_normalized() {
        let mut filter = level_filter();
        filter.set_omega(&Vector3::new(0.3, -0.2, 0.5));
        for _ in 0..50 {
            step(&mut filter, Vector3::new(0.3, -0.2, 0.5), Vector3::new(0.2, -0.1, G));
            assert_relative_eq!(filter.attitude().unwrap().quaternion().norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_covariance_symmetric_after_predict_and_update() {
        let mut filter = level_filter();
        let acc = Vector3::new(0.5, 0.3, G);

        filter.predict(&Vector3::new(0.1, 0.2, -0.3), &acc, DT).unwrap();
        let p = filter.covariance_x();
        assert_relative_eq!(*p, p.transpose(), epsilon = 1e-15);

        filter
            .update(&still(), &acc, &Vector3::zeros(), DT, true)
            .unwrap();
        let p = filter.covariance_x();
        assert_relative_eq!(*p, p.transpose(), epsilon = 1e-15);
    }

    #[test]
    fn test_reset_zeroes_attitude_and_bias_blocks() {
        let mut filter = level_filter();
        filter.set_state_x(Vector15::from_fn(|i, _| i as f64 + 1.0));

        filter.reset_state_vector();

        let x = filter.state_x();
        assert_eq!(x.fixed_rows::<9>(6).into_owned(), Vector9::zeros());
        assert_eq!(x[0], 1.0);
        assert_eq!(x[5], 6.0);
    }

    #[test]
    fn test_update_preserves_yaw() {
        let mut filter = level_filter();
        filter.set_attitude(from_euler_zyx(0.0, 0.0, 0.7));

        // A tilted specific force pulls roll and pitch but carries no heading.
        let acc = Vector3::new(0.3, -0.4, G);
        filter.predict(&Vector3::zeros(), &acc, DT).unwrap();
        let yaw_before = filter.euler().unwrap().z;

        filter
            .update(&still(), &acc, &Vector3::zeros(), DT, false)
            .unwrap();

        let euler = filter.euler().unwrap();
        assert_relative_eq!(euler.z, yaw_before, epsilon = 1e-9);
        assert!(euler.x.abs() > 0.0 || euler.y.abs() > 0.0);
    }

    #[test]
    fn test_update_discards_heading_correction() {
        let mut filter = level_filter();
        filter.set_attitude(from_euler_zyx(0.0, 0.0, 0.7));

        let acc = Vector3::new(0.3, -0.4, G);
        filter.predict(&Vector3::zeros(), &acc, DT).unwrap();
        let yaw_before = filter.euler().unwrap().z;

        // Heading error the gravity measurement cannot observe.
        let mut x = Vector15::zeros();
        x[ErrorBlock::Attitude.offset() + 2] = 0.2;
        filter.set_state_x(x);

        filter
            .update(&still(), &acc, &Vector3::zeros(), DT, false)
            .unwrap();

        assert!(filter.state_x()[ErrorBlock::Attitude.offset() + 2] > 0.1);
        let euler = filter.euler().unwrap();
        assert_relative_eq!(euler.z, yaw_before, epsilon = 1e-9);
        assert!(euler.x.abs() > 1e-6 || euler.y.abs() > 1e-6);
    }

    #[test]
    fn test_uninitialized_attitude_is_reported() {
        let mut filter = Sckf::new(SckfConfig::default());
        let err = filter
            .predict(&Vector3::zeros(), &Vector3::new(0.0, 0.0, G), DT)
            .unwrap_err();

        assert_eq!(err, FilterError::AttitudeNotInitialized);
        assert!(filter.set_heading(0.1).is_err());
    }

    #[test]
    fn test_set_heading_keeps_roll_and_pitch() {
        let mut filter = level_filter();
        filter.set_attitude(from_euler_zyx(0.1, -0.2, 0.3));

        filter.set_heading(1.2).unwrap();

        assert_relative_eq!(filter.euler().unwrap(), Vector3::new(0.1, -0.2, 1.2), epsilon = 1e-10);
    }

    #[test]
    fn test_gain_accessors() {
        let mut filter = level_filter();
        let acc = Vector3::new(0.0, 0.0, G);
        filter.predict(&Vector3::zeros(), &acc, DT).unwrap();
        filter
            .update(&still(), &acc, &Vector3::zeros(), DT, false)
            .unwrap();

        let k = filter.kalman_gain();
        assert_eq!(filter.attitude_kalman_gain(), k.fixed_rows::<9>(6).into_owned());
        assert_eq!(filter.covariance_attitude(), filter.covariance_x().fixed_view::<9, 9>(6, 6).into_owned());
        assert_eq!(filter.magnetic_reference(), &Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(filter.gravity(), Vector3::new(0.0, 0.0, G));
    }
}
