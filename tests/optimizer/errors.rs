use ion_optimizer::{Error, ObservationHistory, SearchBounds, StabilityOptimizer, next_point_query};

use crate::config;

#[test]
fn single_observation_is_degenerate() {
    let history =
        ObservationHistory::from_parts(vec![vec![0.5]], vec![1.0], vec![0.01]).unwrap();
    let err = next_point_query(&history, &config(0.5), &SearchBounds::unit(1), 0).unwrap_err();
    assert!(matches!(err, Error::DegenerateData(_)));
    assert!(err.needs_more_data());
}

#[test]
fn empty_history_is_degenerate() {
    let err = next_point_query(
        &ObservationHistory::new(),
        &config(0.5),
        &SearchBounds::unit(1),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DegenerateData(_)));
}

#[test]
fn zero_objective_is_degenerate() {
    let history = ObservationHistory::from_parts(
        vec![vec![0.1], vec![0.9]],
        vec![0.0, 0.0],
        vec![0.01, 0.01],
    )
    .unwrap();
    let err = next_point_query(&history, &config(0.5), &SearchBounds::unit(1), 0).unwrap_err();
    assert!(matches!(err, Error::DegenerateData(_)));
}

#[test]
fn non_finite_measurement_is_degenerate() {
    let history = ObservationHistory::from_parts(
        vec![vec![0.1], vec![0.9]],
        vec![0.5, f64::NAN],
        vec![0.01, 0.01],
    )
    .unwrap();
    let err = next_point_query(&history, &config(0.5), &SearchBounds::unit(1), 0).unwrap_err();
    assert!(matches!(err, Error::DegenerateData(_)));
}

#[test]
fn bounds_and_history_must_agree() {
    let history = ObservationHistory::from_parts(
        vec![vec![0.1], vec![0.9]],
        vec![0.5, 1.0],
        vec![0.01, 0.01],
    )
    .unwrap();
    let err = next_point_query(&history, &config(0.5), &SearchBounds::unit(2), 0).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn safe_point_fails_when_nothing_is_admissible() {
    let history = ObservationHistory::from_parts(
        vec![vec![0.0], vec![0.5], vec![1.0]],
        vec![0.5, 1.0, 0.5],
        vec![0.8, 0.9, 0.8],
    )
    .unwrap();
    let mut optimizer = StabilityOptimizer::with_seed(config(0.0), 1);
    let err = optimizer
        .next_safe_point(&history, &SearchBounds::unit(1))
        .unwrap_err();
    assert!(matches!(err, Error::NoAdmissibleCandidate { .. }));
}
