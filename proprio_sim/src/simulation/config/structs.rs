// proprio_sim/src/simulation/config/structs.rs

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use proprio_core::config::{AdaptiveConfig, SckfConfig, SckfNoise, UsckfConfig};
use proprio_core::math::quaternion::from_euler_zyx;
use proprio_core::types::{Matrix15, D2R};

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # ScenarioConfig
/// Everything a run needs, parsed from a `scenario.toml` file.
/// Missing sections fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: Simulation,

    #[serde(default)]
    pub world: World,

    #[serde(default)]
    pub imu: ImuConfig,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Optional window of external (non-gravitational) acceleration.
    #[serde(default)]
    pub burst: Option<BurstConfig>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Seed of the pseudo-random number generator.
    pub seed: u64,
    /// Sample period in seconds.
    pub dt: f64,
    /// Number of IMU samples to generate.
    pub steps: usize,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: 42,
            dt: 0.01,
            steps: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct World {
    /// Local gravity magnitude in m/s^2.
    pub gravity: f64,
    /// Magnetic dip angle in degrees.
    pub dip_angle_deg: f64,
}

impl Default for World {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            dip_angle_deg: 0.0,
        }
    }
}

/// Per-axis standard deviations of the inertial sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImuConfig {
    pub gyro_noise_std: [f64; 3],
    pub accel_noise_std: [f64; 3],
    pub gyro_bias_rw: [f64; 3],
    pub accel_bias_rw: [f64; 3],
    pub accel_instability: [f64; 3],
    pub mag_noise_std: [f64; 3],
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            gyro_noise_std: [1e-3; 3],
            accel_noise_std: [1e-2; 3],
            gyro_bias_rw: [1e-5; 3],
            accel_bias_rw: [1e-4; 3],
            accel_instability: [1e-3; 3],
            mag_noise_std: [1e-3; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Initial attitude estimate as `[roll, pitch, yaw]` in degrees.
    pub initial_attitude_deg: [f64; 3],
    /// Standard deviation used on the diagonal of every initial covariance.
    pub initial_std: f64,
    /// Noise of the zero-velocity odometry measurement in m/s.
    pub velocity_noise_std: f64,
    /// Clone the USCKF epochs every this many steps.
    pub clone_every: usize,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub usckf: UsckfConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_attitude_deg: [2.0, -2.0, 0.0],
            initial_std: 0.05,
            velocity_noise_std: 0.01,
            clone_every: 10,
            adaptive: AdaptiveConfig::default(),
            usckf: UsckfConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BurstConfig {
    /// First step with external acceleration.
    pub start_step: usize,
    /// First step after the burst.
    pub end_step: usize,
    /// Body-frame acceleration added to the accelerometer in m/s^2.
    pub acceleration: [f64; 3],
}

impl BurstConfig {
    pub fn contains(&self, step: usize) -> bool {
        (self.start_step..self.end_step).contains(&step)
    }
}

// =========================================================================
// == Conversions into core configuration ==
// =========================================================================

impl ImuConfig {
    pub fn sckf_noise(&self) -> SckfNoise {
        SckfNoise::from_std_devs(
            self.gyro_noise_std,
            self.gyro_bias_rw,
            self.accel_bias_rw,
            self.accel_noise_std,
            self.accel_instability,
            self.mag_noise_std,
        )
    }
}

impl EstimatorConfig {
    pub fn initial_attitude(&self) -> UnitQuaternion<f64> {
        let [roll, pitch, yaw] = self.initial_attitude_deg;
        from_euler_zyx(roll * D2R, pitch * D2R, yaw * D2R)
    }
}

impl ScenarioConfig {
    pub fn sckf_config(&self) -> SckfConfig {
        SckfConfig {
            p0: Matrix15::identity() * self.estimator.initial_std.powi(2),
            noise: self.imu.sckf_noise(),
            gravity: self.world.gravity,
            dip_angle: self.world.dip_angle_deg * D2R,
            adaptive: self.estimator.adaptive,
        }
    }

    /// Odometry noise as a 3x3 covariance.
    pub fn velocity_noise(&self) -> Matrix3<f64> {
        Matrix3::identity() * self.estimator.velocity_noise_std.powi(2)
    }

    pub fn gravity_vector(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, self.world.gravity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ScenarioConfig = toml::from_str(
            r#"
            [simulation]
            seed = 7
            dt = 0.005
            steps = 20

            [burst]
            start_step = 5
            end_step = 10
            acceleration = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.world, World::default());
        assert_eq!(config.estimator, EstimatorConfig::default());
        let burst = config.burst.unwrap();
        assert!(burst.contains(5));
        assert!(!burst.contains(10));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let parsed: Result<ScenarioConfig, _> = toml::from_str("[world]\ngravity = 9.8\nfoo = 1\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_sckf_config_conversion() {
        let config = ScenarioConfig::default();
        let sckf = config.sckf_config();

        assert_eq!(sckf.p0[(0, 0)], 0.05_f64.powi(2));
        assert_eq!(sckf.gravity, 9.81);
        assert_eq!(sckf.noise.ra[(0, 0)], 1e-4);
    }
}
