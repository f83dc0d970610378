// proprio_sim/src/simulation/estimation/usckf.rs

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use tracing::trace;

use proprio_core::estimation::filters::Usckf;
use proprio_core::estimation::UpdateOutcome;
use proprio_core::messages::{AttitudeOutput, ImuSample};
use proprio_core::models::estimation::dynamics::strapdown::StrapdownErrorModel;
use proprio_core::models::estimation::dynamics::ErrorDynamics;
use proprio_core::models::estimation::measurement::{
    proprioceptive_measurement_matrix, proprioceptive_measurement_model,
    proprioceptive_measurement_noise_cov,
};
use proprio_core::states::{AugmentedState, SingleState};
use proprio_core::types::{Matrix15, SCKF_MEASUREMENT_DIM};

use crate::simulation::config::ScenarioConfig;

/// Drives a [`Usckf`] over [`SingleState`] epochs: strapdown mechanization of the
/// nominal state, linear error prediction, a gated proprioceptive update of the
/// active epoch, error reset, and periodic cloning.
pub struct UsckfRunner {
    filter: Usckf<SingleState>,
    model: StrapdownErrorModel,
    measurement_noise: DMatrix<f64>,
    dt: f64,
    clone_every: usize,
    step: usize,
    rejected: usize,
}

fn dynamic(m: &Matrix15) -> DMatrix<f64> {
    DMatrix::from_column_slice(m.nrows(), m.ncols(), m.as_slice())
}

/// Integrates the nominal state over one sample.
fn mechanize(
    nominal: &SingleState,
    imu: &ImuSample,
    gravity: &Vector3<f64>,
    dt: f64,
) -> SingleState {
    let angular_velocity = imu.gyro - nominal.gbias;
    let acc_nav = nominal.orient * (imu.accel - nominal.abias) - gravity;

    SingleState {
        pos: nominal.pos + nominal.vel * dt + acc_nav * (0.5 * dt * dt),
        vel: nominal.vel + acc_nav * dt,
        orient: nominal.orient * UnitQuaternion::from_scaled_axis(angular_velocity * dt),
        ..nominal.clone()
    }
}

impl UsckfRunner {
    pub fn new(config: &ScenarioConfig) -> anyhow::Result<Self> {
        let nominal = SingleState {
            orient: config.estimator.initial_attitude(),
            ..SingleState::default()
        };
        let dim = 3 * SingleState::DOF;
        let p0 = DMatrix::identity(dim, dim) * config.estimator.initial_std.powi(2);

        let filter = Usckf::with_config(
            AugmentedState::new(nominal),
            AugmentedState::new(SingleState::default()),
            p0,
            config.estimator.usckf,
        )?;

        // Velocity block from the odometry, gravity block from the accelerometer noise.
        let dt = config.simulation.dt;
        let accrw = Vector3::from(config.imu.accel_noise_std) * dt.sqrt();
        let mut r = proprioceptive_measurement_noise_cov(&accrw, dt);
        r.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&config.velocity_noise());

        Ok(Self {
            filter,
            model: StrapdownErrorModel::new(config.world.gravity, config.imu.sckf_noise()),
            measurement_noise: DMatrix::from_column_slice(6, 6, r.as_slice()),
            dt,
            clone_every: config.estimator.clone_every.max(1),
            step: 0,
            rejected: 0,
        })
    }

    pub fn step(&mut self, imu: &ImuSample) -> anyhow::Result<AttitudeOutput> {
        let dt = self.dt;
        let prior = self.filter.mu_state().statek_i.clone();

        // --- 1. Predict the error and mechanize the nominal state ---
        let phi = self.model.transition(&prior, imu, dt);
        let qd = self.model.discrete_noise(&prior, imu, dt);
        self.filter.ekf_predict(&dynamic(&phi), &dynamic(&qd))?;

        let nominal = mechanize(&prior, imu, &self.model.gravity, dt);
        self.filter.set_statek_i(nominal.clone());

        // --- 2. Zero-velocity and gravity measurement of the active epoch ---
        let h = proprioceptive_measurement_matrix(&nominal.orient, self.model.gravity.z);
        let gravity_body = nominal.orient.inverse() * self.model.gravity;
        let velocity_error = -nominal.vel;
        let gravity_error = imu.accel - nominal.abias - gravity_body;
        let z = DVector::from_iterator(
            SCKF_MEASUREMENT_DIM,
            velocity_error.iter().chain(gravity_error.iter()).copied(),
        );
        trace!(
            predicted = ?proprioceptive_measurement_model(&self.filter.mu_error().statek_i, &h),
            "usckf measurement"
        );

        let outcome = self.filter.ekf_single_update(
            &z,
            &DMatrix::from_column_slice(6, 15, h.as_slice()),
            &self.measurement_noise,
        )?;
        if let UpdateOutcome::Rejected { innovation } = &outcome {
            self.rejected += 1;
            trace!(innovation = ?innovation.as_slice(), "usckf measurement gated out");
        }

        // --- 3. Reset and clone ---
        self.filter.mu_error_single_reset();
        self.step += 1;
        if self.step % self.clone_every == 0 {
            self.filter.cloning();
        }

        let state = &self.filter.mu_state().statek_i;
        Ok(AttitudeOutput {
            timestamp: imu.timestamp,
            orientation: state.orient,
            gyro_bias: state.gbias,
            accel_bias: state.abias,
            external_acceleration: !outcome.is_applied(),
        })
    }

    /// Number of measurements rejected by the gate so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn filter(&self) -> &Usckf<SingleState> {
        &self.filter
    }
}
