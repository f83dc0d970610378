// proprio_core/tests/filter_cycle.rs

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};
use proprio_core::prelude::*;

const G: f64 = 9.81;
const DT: f64 = 0.01;

fn level_imu(t: f64) -> ImuSample {
    ImuSample {
        timestamp: t,
        gyro: Vector3::zeros(),
        accel: Vector3::new(0.0, 0.0, G),
        mag: Vector3::new(1.0, 0.0, 0.0),
    }
}

#[test]
fn sckf_stationary_outputs_stay_level() {
    let mut filter = Sckf::new(SckfConfig::default());
    filter.set_attitude(UnitQuaternion::identity());
    let odometry = KinematicMeasurement::from_velocity_error(Vector3::zeros(), 0.01);

    for i in 0..200 {
        let imu = level_imu(i as f64 * DT);
        filter.predict(&imu.gyro, &imu.accel, DT).unwrap();
        filter
            .update(&odometry, &imu.accel, &imu.mag, DT, false)
            .unwrap();
        filter.reset_state_vector();

        let output = filter.output(imu.timestamp).unwrap();
        assert_relative_eq!(output.orientation.quaternion().norm(), 1.0, epsilon = 1e-12);
        assert!(output.orientation.angle() < 1e-6);
        assert!(!output.external_acceleration);
    }

    let p = filter.covariance_x();
    assert_relative_eq!(*p, p.transpose(), epsilon = 1e-12);
    assert!((0..15).all(|i| p[(i, i)] > 0.0));
}

#[test]
fn sckf_predict_only_stationary_run() {
    let mut filter = Sckf::new(SckfConfig::default());
    filter.set_attitude(UnitQuaternion::identity());

    for i in 0..100 {
        let imu = level_imu(i as f64 * DT);
        filter.predict(&imu.gyro, &imu.accel, DT).unwrap();
    }

    assert!(filter.attitude().unwrap().angle() < 1e-6);
    let x = filter.state_x();
    assert!(x.fixed_rows::<6>(0).iter().all(|v| *v == 0.0));
}

fn usckf() -> Usckf<SingleState> {
    let dim = 3 * SingleState::DOF;
    Usckf::new(
        AugmentedState::new(SingleState::default()),
        AugmentedState::new(SingleState::default()),
        DMatrix::identity(dim, dim) * 0.01,
    )
    .unwrap()
}

fn velocity_observation() -> DMatrix<f64> {
    let mut h = DMatrix::zeros(3, SingleState::DOF);
    h.view_mut((0, ErrorBlock::Velocity.offset()), (3, 3))
        .fill_diagonal(1.0);
    h
}

#[test]
fn usckf_predict_update_reset_clone_cycle() {
    let mut filter = usckf();
    let model = StrapdownErrorModel::new(G, SckfNoise::default());
    let imu = level_imu(0.0);
    let nominal = filter.mu_state().statek_i.clone();

    let phi = model.transition(&nominal, &imu, DT);
    let qd = model.discrete_noise(&nominal, &imu, DT);
    filter
        .predict(|e: &SingleState| model.propagate_error(e, &phi), &DMatrix::from_column_slice(15, 15, qd.as_slice()))
        .unwrap();

    // A consistent zero-velocity observation passes the gate.
    let r = DMatrix::identity(3, 3) * 1e-4;
    let outcome = filter
        .ekf_single_update(&DVector::from_element(3, 0.02), &velocity_observation(), &r)
        .unwrap();
    assert!(outcome.is_applied());
    assert_relative_eq!(filter.mu_state().statek_i.vel, Vector3::from_element(0.02), epsilon = 1e-3);

    filter.mu_error_single_reset();
    assert_eq!(filter.mu_error().statek_i, SingleState::default());

    filter.cloning();
    let state = filter.mu_state();
    assert_eq!(state.statek, state.statek_i);
    assert_eq!(state.statek_l, state.statek_i);
    let p = filter.pk_augmented_state();
    assert_relative_eq!(p.clone(), p.transpose(), epsilon = 1e-12);
}

#[test]
fn usckf_gate_rejects_outlier_without_touching_state() {
    let mut filter = usckf();
    let before = filter.pk_augmented_state().clone();
    let r = DMatrix::identity(3, 3) * 1e-4;

    let outcome = filter
        .ekf_single_update(&DVector::from_element(3, 50.0), &velocity_observation(), &r)
        .unwrap();

    assert!(!outcome.is_applied());
    assert_eq!(filter.pk_augmented_state(), &before);
    assert_eq!(filter.mu_state().statek_i, SingleState::default());
}
