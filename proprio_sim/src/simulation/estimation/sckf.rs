// proprio_sim/src/simulation/estimation/sckf.rs

use nalgebra::Vector3;

use proprio_core::estimation::filters::Sckf;
use proprio_core::messages::{AttitudeOutput, ImuSample, KinematicMeasurement};

use crate::simulation::config::ScenarioConfig;

/// Drives an [`Sckf`] with one IMU sample per step and a zero-velocity odometry.
pub struct SckfRunner {
    filter: Sckf,
    dt: f64,
    velocity_noise_std: f64,
}

impl SckfRunner {
    pub fn new(config: &ScenarioConfig) -> Self {
        let mut filter = Sckf::new(config.sckf_config());
        filter.set_attitude(config.estimator.initial_attitude());
        Self {
            filter,
            dt: config.simulation.dt,
            velocity_noise_std: config.estimator.velocity_noise_std,
        }
    }

    /// Predict, correct and reset for one sample.
    pub fn step(&mut self, imu: &ImuSample) -> anyhow::Result<AttitudeOutput> {
        // The platform is not moving, so the kinematic chain reports no velocity error.
        let kinematics =
            KinematicMeasurement::from_velocity_error(Vector3::zeros(), self.velocity_noise_std);

        self.filter.predict(&imu.gyro, &imu.accel, self.dt)?;
        self.filter
            .update(&kinematics, &imu.accel, &imu.mag, self.dt, false)?;
        self.filter.reset_state_vector();

        Ok(self.filter.output(imu.timestamp)?)
    }

    pub fn filter(&self) -> &Sckf {
        &self.filter
    }
}
