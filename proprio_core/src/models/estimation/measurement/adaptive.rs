// proprio_core/src/models/estimation/measurement/adaptive.rs

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use tracing::{debug, trace};

use crate::config::AdaptiveConfig;
use crate::error::FilterError;

/// Adaptive inflation of the gravity-based attitude measurement noise.
///
/// The accelerometer only measures gravity while the platform is not accelerating.
/// Residual outer products are averaged over a window of `m1` calls and compared,
/// direction by direction, with the covariance the filter expects. Whenever the
/// observed spread exceeds the expected one by more than `gamma`, the excess is
/// returned as an extra noise term `Q*`. The last `Q*` is held for `m2` quiet calls
/// before it is released to zero.
#[derive(Debug, Clone)]
pub struct AdaptiveAttitudeCov {
    config: AdaptiveConfig,
    r_hist: Vec<Matrix3<f64>>,
    r1count: usize,
    r2count: usize,
    qstar: Matrix3<f64>,
}

impl AdaptiveAttitudeCov {
    pub fn new(config: AdaptiveConfig) -> Self {
        let window = config.m1.max(1);
        Self {
            config,
            r_hist: vec![Matrix3::zeros(); window],
            r1count: 0,
            r2count: config.r2count,
            qstar: Matrix3::zeros(),
        }
    }

    /// Feeds one residual and returns the noise inflation `Q*` to add to `Ra`.
    ///
    /// # Arguments
    /// * `xk`: The attitude error sub-state.
    /// * `pk`: Its covariance.
    /// * `z`: The gravity residual `acc - ba - C g`.
    /// * `h`: The gravity observation matrix over the sub-state.
    /// * `ra`: The nominal accelerometer noise.
    pub fn matrix<const N: usize>(
        &mut self,
        xk: &SVector<f64, N>,
        pk: &SMatrix<f64, N, N>,
        z: &Vector3<f64>,
        h: &SMatrix<f64, 3, N>,
        ra: &Matrix3<f64>,
    ) -> Result<Matrix3<f64>, FilterError> {
        // 1. Store the instantaneous residual covariance in the ring buffer.
        let residual = z - h * xk;
        let window = self.r_hist.len();
        self.r_hist[self.r1count] = residual * residual.transpose();
        self.r1count = (self.r1count + 1) % window;

        // 2. Observed vs expected covariance.
        let uk = self.r_hist.iter().sum::<Matrix3<f64>>() / window as f64;
        let expected = h * pk * h.transpose() + ra;

        // 3. Compare both along the principal directions of the observation.
        let svd = uk.svd(true, false);
        let u = svd.u.ok_or(FilterError::DecompositionFailed {
            context: "adaptive residual window",
        })?;
        let lambda = svd.singular_values;
        let mu = Vector3::from_fn(|i, _| u.column(i).dot(&(expected * u.column(i))));
        let excess = lambda - mu;

        if excess.max() > self.config.gamma {
            self.r2count = 0;
            self.qstar = inflation(&u, &excess);
            debug!(excess = excess.max(), "external acceleration detected");
        } else {
            self.r2count = self.r2count.saturating_add(1);
            if self.r2count >= self.config.m2 {
                self.qstar = Matrix3::zeros();
            }
            trace!(r2count = self.r2count, "adaptive window quiet");
        }

        Ok(self.qstar)
    }

    /// The inflation returned by the last call.
    pub fn qstar(&self) -> &Matrix3<f64> {
        &self.qstar
    }

    /// Number of consecutive quiet calls.
    pub fn r2count(&self) -> usize {
        self.r2count
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// True while an inflation is active.
    pub fn is_inflating(&self) -> bool {
        self.qstar != Matrix3::zeros()
    }
}

/// `Σ max(excessᵢ, 0) uᵢuᵢᵀ`.
fn inflation(u: &Matrix3<f64>, excess: &Vector3<f64>) -> Matrix3<f64> {
    let mut q = Matrix3::zeros();
    for i in 0..3 {
        let ui = u.column(i);
        q += ui * ui.transpose() * excess[i].max(0.0);
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Matrix3x9, Matrix9, Vector9};

    fn gravity_observation() -> Matrix3x9 {
        let mut h = Matrix3x9::zeros();
        h.fixed_view_mut::<3, 3>(0, 6).copy_from(&Matrix3::identity());
        h
    }

    fn feed(cov: &mut AdaptiveAttitudeCov, z: Vector3<f64>) -> Matrix3<f64> {
        let ra = Matrix3::identity() * 1e-4;
        cov.matrix(
            &Vector9::zeros(),
            &(Matrix9::identity() * 1e-6),
            &z,
            &gravity_observation(),
            &ra,
        )
        .unwrap()
    }

    #[test]
    fn test_quiet_sequence_releases_inflation() {
        let config = AdaptiveConfig {
            m1: 10,
            m2: 3,
            gamma: 0.1,
            r2count: 0,
        };
        let mut cov = AdaptiveAttitudeCov::new(config);

        let mut qstar = Matrix3::identity();
        for i in 0..50 {
            // Small zero-mean residuals.
            let s = if i % 2 == 0 { 1.0 } else { -1.0 };
            qstar = feed(&mut cov, Vector3::new(0.005 * s, -0.003 * s, 0.004 * s));
        }

        assert!(cov.r2count() >= config.m2);
        assert_eq!(qstar, Matrix3::zeros());

        let qstar = feed(&mut cov, Vector3::new(100.0, 0.0, 0.0));
        assert_ne!(qstar, Matrix3::zeros());
        assert_eq!(cov.r2count(), 0);
        assert!(cov.is_inflating());
    }

    #[test]
    fn test_inflation_is_latched_until_m2_quiet_calls() {
        let config = AdaptiveConfig {
            m1: 1,
            m2: 3,
            gamma: 0.1,
            r2count: 0,
        };
        let mut cov = AdaptiveAttitudeCov::new(config);

        let burst = feed(&mut cov, Vector3::new(5.0, 0.0, 0.0));
        assert!(burst[(0, 0)] > 24.0);

        // With a window of one, the next quiet residual clears the observation at once.
        assert_eq!(feed(&mut cov, Vector3::zeros()), burst);
        assert_eq!(feed(&mut cov, Vector3::zeros()), burst);
        assert_eq!(feed(&mut cov, Vector3::zeros()), Matrix3::zeros());
        assert_eq!(cov.r2count(), 3);
    }

    #[test]
    fn test_degenerate_window_gives_no_inflation() {
        let mut cov = AdaptiveAttitudeCov::new(AdaptiveConfig::default());
        assert_eq!(feed(&mut cov, Vector3::zeros()), Matrix3::zeros());
    }
}
