// proprio_sim/src/simulation/sensors/imu.rs

use nalgebra::{UnitQuaternion, Vector3};
use rand_distr::{Distribution, Normal};

// --- Simulation Crate Imports ---
use crate::simulation::config::{BurstConfig, ScenarioConfig};
use crate::simulation::core::prng::SimulationRng;

// --- Core Library Imports ---
use proprio_core::math::quaternion::quaternion_to_dcm;
use proprio_core::messages::ImuSample;
use proprio_core::models::estimation::measurement::magnetometer::{
    magnetic_reference, predicted_body_field,
};
use proprio_core::types::D2R;

// =========================================================================
// == IMU Source ==
// =========================================================================

/// Synthetic inertial sensor on a platform that does not move.
///
/// Gyros read pure noise, accelerometers read gravity plus noise, and the
/// magnetometer reads the reference field. Inside the configured burst window the
/// accelerometer also senses an external acceleration.
pub struct ImuSource {
    rng: SimulationRng,
    accel_noise: [Normal<f64>; 3], // X, Y, Z
    gyro_noise: [Normal<f64>; 3],  // X, Y, Z
    mag_noise: [Normal<f64>; 3],   // X, Y, Z

    true_attitude: UnitQuaternion<f64>,
    gravity: Vector3<f64>,
    magnetic_field: Vector3<f64>,
    burst: Option<BurstConfig>,
    dt: f64,
    step: usize,
}

fn normals(stds: [f64; 3]) -> anyhow::Result<[Normal<f64>; 3]> {
    Ok([
        Normal::new(0.0, stds[0])?,
        Normal::new(0.0, stds[1])?,
        Normal::new(0.0, stds[2])?,
    ])
}

impl ImuSource {
    pub fn new(config: &ScenarioConfig) -> anyhow::Result<Self> {
        Ok(Self {
            rng: SimulationRng::from_seed(config.simulation.seed),
            accel_noise: normals(config.imu.accel_noise_std)?,
            gyro_noise: normals(config.imu.gyro_noise_std)?,
            mag_noise: normals(config.imu.mag_noise_std)?,
            true_attitude: UnitQuaternion::identity(),
            gravity: config.gravity_vector(),
            magnetic_field: magnetic_reference(config.world.dip_angle_deg * D2R),
            burst: config.burst.clone(),
            dt: config.simulation.dt,
            step: 0,
        })
    }

    pub fn true_attitude(&self) -> &UnitQuaternion<f64> {
        &self.true_attitude
    }

    /// Whether the next sample falls inside the burst window.
    pub fn in_burst(&self) -> bool {
        self.burst.as_ref().is_some_and(|b| b.contains(self.step))
    }

    /// Produces the next sample and advances the clock.
    pub fn sample(&mut self) -> ImuSample {
        // --- 1. Ideal readings ---
        let mut accel = quaternion_to_dcm(&self.true_attitude) * self.gravity;
        if let Some(burst) = self.burst.as_ref().filter(|b| b.contains(self.step)) {
            accel += Vector3::from(burst.acceleration);
        }
        let mag = predicted_body_field(&self.true_attitude, &self.magnetic_field);

        // --- 2. Corrupt with noise ---
        let rng = &mut self.rng.0;
        let accel = accel + Vector3::from_fn(|i, _| self.accel_noise[i].sample(rng));
        let gyro = Vector3::from_fn(|i, _| self.gyro_noise[i].sample(rng));
        let mag = mag + Vector3::from_fn(|i, _| self.mag_noise[i].sample(rng));

        let sample = ImuSample {
            timestamp: self.step as f64 * self.dt,
            gyro,
            accel,
            mag,
        };
        self.step += 1;
        sample
    }
}
