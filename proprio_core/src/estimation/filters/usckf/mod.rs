// proprio_core/src/estimation/filters/usckf/mod.rs

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::config::UsckfConfig;
use crate::error::FilterError;
use crate::estimation::ekf::{ekf_predict, ekf_update, EkfMeasurementParams};
use crate::estimation::gating::{accept_any_mahalanobis_distance, accept_mahalanobis_distance};
use crate::estimation::sigma_points;
use crate::estimation::{ProcessNoise, UpdateOutcome};
use crate::math::linalg::{quadratic_form, spd_inverse, spd_solve};
use crate::math::manifold::Manifold;
use crate::states::{epoch_block, set_epoch_block, AugmentedState, Epoch, ErrorState};

pub mod cloning;

/// Unscented stochastic-cloning Kalman filter over an augmented manifold state.
///
/// The filter keeps the nominal state `mu_state` and the error state `mu_error`, both
/// laid out as three epochs of `S` followed by two feature blocks, and a single
/// covariance `pk_error` over the tangent space of the error. Prediction and single
/// updates act on the active epoch `statek_i` only; the cross-covariances with the
/// cloned epochs are carried along.
#[derive(Debug, Clone)]
pub struct Usckf<S: ErrorState> {
    mu_state: AugmentedState<S>,
    mu_error: AugmentedState<S>,
    pk_error: DMatrix<f64>,
    config: UsckfConfig,
}

impl<S: ErrorState> Usckf<S> {
    pub fn new(
        state: AugmentedState<S>,
        error: AugmentedState<S>,
        p0: DMatrix<f64>,
    ) -> Result<Self, FilterError> {
        Self::with_config(state, error, p0, UsckfConfig::default())
    }

    pub fn with_config(
        state: AugmentedState<S>,
        error: AugmentedState<S>,
        p0: DMatrix<f64>,
        config: UsckfConfig,
    ) -> Result<Self, FilterError> {
        let n = state.dof();
        if error.dof() != n {
            return Err(FilterError::DimensionMismatch {
                context: "usckf error state",
                expected: n,
                actual: error.dof(),
            });
        }
        check_square(&p0, n, "usckf initial covariance")?;

        Ok(Self {
            mu_state: state,
            mu_error: error,
            pk_error: p0,
            config,
        })
    }

    // --- Accessors ---

    pub fn mu_state(&self) -> &AugmentedState<S> {
        &self.mu_state
    }

    pub fn mu_error(&self) -> &AugmentedState<S> {
        &self.mu_error
    }

    pub fn pk_augmented_state(&self) -> &DMatrix<f64> {
        &self.pk_error
    }

    /// Covariance block of the active epoch.
    pub fn pk_single_state(&self) -> DMatrix<f64> {
        epoch_block(&self.pk_error, Epoch::KI, Epoch::KI, S::DOF)
    }

    pub fn config(&self) -> &UsckfConfig {
        &self.config
    }

    /// Replaces the nominal active epoch.
    pub fn set_statek_i(&mut self, state: S) {
        self.mu_state.statek_i = state;
    }

    /// Zeroes the error of the active epoch after it has been injected.
    pub fn mu_error_single_reset(&mut self) {
        self.mu_error.statek_i.reset();
    }

    // --- Prediction ---

    /// Unscented prediction of the active epoch through the process model `f`.
    ///
    /// The linear map `Fk = Pxyᵀ Pk⁻¹` recovered from the sigma points propagates the
    /// cross-covariances with the cloned epochs.
    pub fn predict<F, Q>(&mut self, f: F, q: &Q) -> Result<(), FilterError>
    where
        F: Fn(&S) -> S,
        Q: ProcessNoise + ?Sized,
    {
        let qk = q.covariance();
        check_square(&qk, S::DOF, "usckf process noise")?;

        let prior = self.mu_error.statek_i.clone();
        let pk = self.pk_single_state();

        // --- 1. Sigma points of the active epoch through the process model ---
        let points = sigma_points::generate(&prior, &pk)?;
        let propagated: Vec<S> = points.iter().map(&f).collect();

        // --- 2. Mean and equivalent linearization ---
        let mean = sigma_points::manifold_mean(&propagated, &self.config)?;
        let pxy = sigma_points::cross_covariance(&prior, &mean, &points, &propagated);
        let fk = spd_solve(&pk, &pxy, "usckf prior covariance")?.transpose();

        // --- 3. Covariance of the active epoch and its cross terms ---
        let p_pred = sigma_points::covariance(&mean, &propagated) + qk;
        set_epoch_block(&mut self.pk_error, Epoch::KI, Epoch::KI, S::DOF, &p_pred);
        self.propagate_cross_covariance(&fk);

        self.mu_error.statek_i = mean;
        trace!(dof = S::DOF, "usckf predicted");
        Ok(())
    }

    /// Linear prediction of the active epoch: `x ← F x`, `P ← F P Fᵀ + Q`.
    pub fn ekf_predict(&mut self, f: &DMatrix<f64>, q: &DMatrix<f64>) -> Result<(), FilterError> {
        check_square(f, S::DOF, "usckf transition matrix")?;
        check_square(q, S::DOF, "usckf process noise")?;

        let (x, p_pred) = ekf_predict(
            &self.mu_error.statek_i.vectorized(),
            &self.pk_single_state(),
            f,
            q,
        );
        self.mu_error.statek_i.set_vectorized(x.as_slice());
        set_epoch_block(&mut self.pk_error, Epoch::KI, Epoch::KI, S::DOF, &p_pred);
        self.propagate_cross_covariance(f);
        Ok(())
    }

    fn propagate_cross_covariance(&mut self, fk: &DMatrix<f64>) {
        let n = S::DOF;
        for epoch in [Epoch::K, Epoch::KL] {
            let right = epoch_block(&self.pk_error, epoch, Epoch::KI, n) * fk.transpose();
            set_epoch_block(&mut self.pk_error, epoch, Epoch::KI, n, &right);

            let left = fk * epoch_block(&self.pk_error, Epoch::KI, epoch, n);
            set_epoch_block(&mut self.pk_error, Epoch::KI, epoch, n, &left);
        }
    }

    // --- Updates over the full augmented state ---

    /// Unscented update of the whole augmented error state. Every measurement is accepted.
    pub fn update<H>(
        &mut self,
        z: &DVector<f64>,
        h: H,
        r: &DMatrix<f64>,
    ) -> Result<UpdateOutcome, FilterError>
    where
        H: Fn(&AugmentedState<S>) -> DVector<f64>,
    {
        self.update_gated(z, h, r, accept_any_mahalanobis_distance)
    }

    pub fn update_gated<H, T>(
        &mut self,
        z: &DVector<f64>,
        h: H,
        r: &DMatrix<f64>,
        test: T,
    ) -> Result<UpdateOutcome, FilterError>
    where
        H: Fn(&AugmentedState<S>) -> DVector<f64>,
        T: Fn(f64, usize) -> bool,
    {
        check_square(r, z.len(), "usckf measurement noise")?;

        let points = sigma_points::generate(&self.mu_error, &self.pk_error)?;
        let gain = unscented_gain(&self.mu_error, &points, z, h, r)?;

        if !test(gain.mahalanobis2, z.len()) {
            debug!(mahalanobis2 = gain.mahalanobis2, "usckf update rejected");
            return Ok(UpdateOutcome::Rejected {
                innovation: gain.innovation,
            });
        }

        let p = &self.pk_error - &gain.k * &gain.s * gain.k.transpose();
        self.pk_error = (&p + p.transpose()) * 0.5;
        let correction = &gain.k * &gain.innovation;
        self.mu_error.boxplus_assign(correction.as_slice());
        Ok(UpdateOutcome::Applied)
    }

    /// Linear update of the whole augmented error state in vectorized coordinates,
    /// gated at 5% significance.
    pub fn ekf_update(
        &mut self,
        z: &DVector<f64>,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<UpdateOutcome, FilterError> {
        self.ekf_update_gated(z, h, r, accept_mahalanobis_distance)
    }

    pub fn ekf_update_gated<T>(
        &mut self,
        z: &DVector<f64>,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
        test: T,
    ) -> Result<UpdateOutcome, FilterError>
    where
        T: Fn(f64, usize) -> bool,
    {
        let params = EkfMeasurementParams { z, h, r };
        let correction = ekf_update(&self.mu_error.vectorized(), &self.pk_error, &params)?;

        if !test(correction.mahalanobis2, z.len()) {
            debug!(mahalanobis2 = correction.mahalanobis2, "usckf linear update rejected");
            return Ok(UpdateOutcome::Rejected {
                innovation: correction.innovation,
            });
        }

        self.mu_error.set_vectorized(correction.x.as_slice());
        self.pk_error = correction.p;
        Ok(UpdateOutcome::Applied)
    }

    // --- Updates of the active epoch ---

    /// Unscented update of the active epoch, followed by injection of its error into
    /// the nominal active epoch. Every measurement is accepted.
    pub fn single_update<H>(
        &mut self,
        z: &DVector<f64>,
        h: H,
        r: &DMatrix<f64>,
    ) -> Result<UpdateOutcome, FilterError>
    where
        H: Fn(&S) -> DVector<f64>,
    {
        self.single_update_gated(z, h, r, accept_any_mahalanobis_distance)
    }

    pub fn single_update_gated<H, T>(
        &mut self,
        z: &DVector<f64>,
        h: H,
        r: &DMatrix<f64>,
        test: T,
    ) -> Result<UpdateOutcome, FilterError>
    where
        H: Fn(&S) -> DVector<f64>,
        T: Fn(f64, usize) -> bool,
    {
        check_square(r, z.len(), "usckf measurement noise")?;

        let pk = self.pk_single_state();
        let points = sigma_points::generate(&self.mu_error.statek_i, &pk)?;
        let gain = unscented_gain(&self.mu_error.statek_i, &points, z, h, r)?;

        if !test(gain.mahalanobis2, z.len()) {
            debug!(mahalanobis2 = gain.mahalanobis2, "usckf single update rejected");
            return Ok(UpdateOutcome::Rejected {
                innovation: gain.innovation,
            });
        }

        let p = pk - &gain.k * &gain.s * gain.k.transpose();
        let p = (&p + p.transpose()) * 0.5;
        set_epoch_block(&mut self.pk_error, Epoch::KI, Epoch::KI, S::DOF, &p);

        let correction = &gain.k * &gain.innovation;
        self.mu_error.statek_i.boxplus_assign(correction.as_slice());
        self.mu_error.statek_i.inject_into(&mut self.mu_state.statek_i);
        Ok(UpdateOutcome::Applied)
    }

    /// Linear update of the active epoch in vectorized coordinates, gated at 5%
    /// significance. On acceptance the corrected error is injected into the nominal
    /// active epoch, with the orientation error read as `(1, δθ)`.
    pub fn ekf_single_update(
        &mut self,
        z: &DVector<f64>,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<UpdateOutcome, FilterError> {
        self.ekf_single_update_gated(z, h, r, accept_mahalanobis_distance)
    }

    pub fn ekf_single_update_gated<T>(
        &mut self,
        z: &DVector<f64>,
        h: &DMatrix<f64>,
        r: &DMatrix<f64>,
        test: T,
    ) -> Result<UpdateOutcome, FilterError>
    where
        T: Fn(f64, usize) -> bool,
    {
        let params = EkfMeasurementParams { z, h, r };
        let correction = ekf_update(
            &self.mu_error.statek_i.vectorized(),
            &self.pk_single_state(),
            &params,
        )?;

        if !test(correction.mahalanobis2, z.len()) {
            debug!(mahalanobis2 = correction.mahalanobis2, "usckf single linear update rejected");
            return Ok(UpdateOutcome::Rejected {
                innovation: correction.innovation,
            });
        }

        set_epoch_block(&mut self.pk_error, Epoch::KI, Epoch::KI, S::DOF, &correction.p);
        self.mu_error.statek_i.set_vectorized(correction.x.as_slice());
        self.mu_error.statek_i.inject_into(&mut self.mu_state.statek_i);
        Ok(UpdateOutcome::Applied)
    }

    // --- Diagnostics ---

    /// Regenerates the sigma points of the augmented error state and returns the
    /// largest absolute difference between their covariance and `pk_error`.
    pub fn check_sigma_points(&self) -> Result<f64, FilterError> {
        let points = sigma_points::generate(&self.mu_error, &self.pk_error)?;
        let mean = sigma_points::manifold_mean(&points, &self.config)?;
        let recovered = sigma_points::covariance(&mean, &points);
        Ok((recovered - &self.pk_error).amax())
    }
}

/// Quantities shared by the unscented updates.
struct UnscentedGain {
    k: DMatrix<f64>,
    s: DMatrix<f64>,
    innovation: DVector<f64>,
    mahalanobis2: f64,
}

fn unscented_gain<M, H>(
    mean: &M,
    points: &[M],
    z: &DVector<f64>,
    h: H,
    r: &DMatrix<f64>,
) -> Result<UnscentedGain, FilterError>
where
    M: Manifold,
    H: Fn(&M) -> DVector<f64>,
{
    let zs: Vec<DVector<f64>> = points.iter().map(h).collect();
    if let Some(bad) = zs.iter().find(|zi| zi.len() != z.len()) {
        return Err(FilterError::DimensionMismatch {
            context: "usckf measurement model output",
            expected: z.len(),
            actual: bad.len(),
        });
    }

    let mean_z = sigma_points::vector_mean(&zs);
    let s = sigma_points::covariance(&mean_z, &zs) + r;
    let cov_xz = sigma_points::cross_covariance(mean, &mean_z, points, &zs);

    let s_inv = spd_inverse(s.clone(), "usckf innovation covariance")?;
    let k = cov_xz * &s_inv;
    let innovation = z - mean_z;
    let mahalanobis2 = quadratic_form(&innovation, &s_inv);

    Ok(UnscentedGain {
        k,
        s,
        innovation,
        mahalanobis2,
    })
}

fn check_square(m: &DMatrix<f64>, dim: usize, context: &'static str) -> Result<(), FilterError> {
    if m.nrows() != dim || m.ncols() != dim {
        return Err(FilterError::DimensionMismatch {
            context,
            expected: dim,
            actual: if m.nrows() != dim { m.nrows() } else { m.ncols() },
        });
    }
    Ok(())
}
