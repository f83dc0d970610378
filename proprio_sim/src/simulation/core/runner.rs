// proprio_sim/src/simulation/core/runner.rs

use nalgebra::UnitQuaternion;
use serde::Serialize;
use tracing::{debug, info};

use proprio_core::messages::{AttitudeOutput, ImuSample};

use crate::cli::FilterChoice;
use crate::simulation::config::ScenarioConfig;
use crate::simulation::debugging::{attitude_error_deg, log_attitude_error};
use crate::simulation::estimation::{SckfRunner, UsckfRunner};
use crate::simulation::sensors::ImuSource;

/// Steps between two state error reports.
const REPORT_EVERY: usize = 100;

/// One recorded IMU sample with the truth it was generated from.
struct Recorded {
    sample: ImuSample,
    truth: UnitQuaternion<f64>,
    in_burst: bool,
}

/// Final figures of one estimator over a scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub filter: &'static str,
    pub steps: usize,
    pub final_attitude_error_deg: f64,
    pub max_attitude_error_deg: f64,
    /// Steps on which the estimator flagged an external acceleration.
    pub flagged_steps: usize,
    /// Flagged steps that fall inside the burst window.
    pub flagged_in_burst: usize,
    /// Measurements the gate threw away. Only the USCKF gates its updates.
    pub rejected_updates: Option<usize>,
}

/// Accumulates per-step outputs into a [`RunSummary`].
struct Tally {
    filter: &'static str,
    steps: usize,
    last_error: f64,
    max_error: f64,
    flagged: usize,
    flagged_in_burst: usize,
}

impl Tally {
    fn new(filter: &'static str) -> Self {
        Self {
            filter,
            steps: 0,
            last_error: 0.0,
            max_error: 0.0,
            flagged: 0,
            flagged_in_burst: 0,
        }
    }

    fn record(&mut self, recorded: &Recorded, output: &AttitudeOutput) {
        let error = if self.steps % REPORT_EVERY == 0 {
            log_attitude_error(self.filter, &recorded.truth, output)
        } else {
            attitude_error_deg(&recorded.truth, &output.orientation)
        };

        self.steps += 1;
        self.last_error = error;
        self.max_error = self.max_error.max(error);
        if output.external_acceleration {
            self.flagged += 1;
            if recorded.in_burst {
                self.flagged_in_burst += 1;
            }
        }
    }

    fn finish(self, rejected_updates: Option<usize>) -> RunSummary {
        RunSummary {
            filter: self.filter,
            steps: self.steps,
            final_attitude_error_deg: self.last_error,
            max_attitude_error_deg: self.max_error,
            flagged_steps: self.flagged,
            flagged_in_burst: self.flagged_in_burst,
            rejected_updates,
        }
    }
}

fn record_samples(config: &ScenarioConfig) -> anyhow::Result<Vec<Recorded>> {
    let mut source = ImuSource::new(config)?;
    Ok((0..config.simulation.steps)
        .map(|_| {
            let in_burst = source.in_burst();
            let truth = *source.true_attitude();
            Recorded {
                sample: source.sample(),
                truth,
                in_burst,
            }
        })
        .collect())
}

/// Runs the selected estimators over the same simulated sample stream.
pub fn run(config: &ScenarioConfig, choice: FilterChoice) -> anyhow::Result<Vec<RunSummary>> {
    let samples = record_samples(config)?;
    debug!(count = samples.len(), "recorded imu samples");
    let mut summaries = Vec::new();

    if choice.runs_sckf() {
        let mut runner = SckfRunner::new(config);
        let mut tally = Tally::new("SCKF");
        for recorded in &samples {
            let output = runner.step(&recorded.sample)?;
            tally.record(recorded, &output);
        }
        summaries.push(tally.finish(None));
    }

    if choice.runs_usckf() {
        let mut runner = UsckfRunner::new(config)?;
        let mut tally = Tally::new("USCKF");
        for recorded in &samples {
            let output = runner.step(&recorded.sample)?;
            tally.record(recorded, &output);
        }
        summaries.push(tally.finish(Some(runner.rejected())));
    }

    for summary in &summaries {
        info!(
            "{} done | steps: {} | final err: {:.3}° | max err: {:.3}° | flagged: {} ({} in burst)",
            summary.filter,
            summary.steps,
            summary.final_attitude_error_deg,
            summary.max_attitude_error_deg,
            summary.flagged_steps,
            summary.flagged_in_burst,
        );
    }
    Ok(summaries)
}
