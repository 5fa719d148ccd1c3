use ion_optimizer::{SearchBounds, next_point_query};

use crate::{config, rising};

#[test]
fn rising_objective_pushes_past_the_best_sample() {
    let history = rising([1e-4; 5]);
    let bounds = SearchBounds::unit(1);
    for seed in [42, 7, 3] {
        let proposal = next_point_query(&history, &config(0.5), &bounds, seed).unwrap();
        assert!(proposal.is_admissible());
        assert!(
            proposal.point[0] > 0.8 && proposal.point[0] <= 1.0,
            "seed {seed}: {:?}",
            proposal.point
        );
    }
}

#[test]
fn unstable_sample_repels_the_search() {
    let history = rising([1e-4, 1e-4, 1e-4, 1e-4, 0.5]);
    let bounds = SearchBounds::unit(1);
    for seed in [42, 7, 3] {
        let proposal = next_point_query(&history, &config(0.5), &bounds, seed).unwrap();
        assert!(proposal.is_admissible());
        assert!(
            (proposal.point[0] - 0.8).abs() > 0.1,
            "seed {seed}: {:?}",
            proposal.point
        );
    }
}

#[test]
fn physical_units_round_trip_through_the_unit_cube() {
    let unit = rising([1e-4; 5]);
    let scaled = ion_optimizer::ObservationHistory::from_parts(
        unit.settings().iter().map(|s| vec![100.0 + 50.0 * s[0]]).collect(),
        unit.objective().to_vec(),
        unit.stability().to_vec(),
    )
    .unwrap();
    let bounds = SearchBounds::new(vec![100.0], vec![150.0]).unwrap();

    let a = next_point_query(&unit, &config(0.5), &SearchBounds::unit(1), 42).unwrap();
    let b = next_point_query(&scaled, &config(0.5), &bounds, 42).unwrap();
    assert!((a.normalized[0] - b.normalized[0]).abs() < 1e-6);
    assert!((b.point[0] - (100.0 + 50.0 * a.point[0])).abs() < 1e-4);
}

#[test]
fn two_dimensional_history() {
    let history = ion_optimizer::ObservationHistory::from_parts(
        vec![
            vec![0.2, 0.2],
            vec![0.5, 0.5],
            vec![0.8, 0.3],
            vec![0.3, 0.7],
        ],
        vec![0.5, 1.0, 0.6, 0.7],
        vec![0.001, 0.002, 0.001, 0.001],
    )
    .unwrap();
    let config = ion_optimizer::OptimizerConfig::builder()
        .kernel_length_scales(vec![0.3, 0.3])
        .risk_tolerance(0.5)
        .build()
        .unwrap();
    let bounds = SearchBounds::unit(2);

    let proposal = next_point_query(&history, &config, &bounds, 11).unwrap();
    assert_eq!(proposal.point.len(), 2);
    assert!(bounds.contains(&proposal.point));
    assert!(proposal.is_admissible());
}

#[test]
fn tuned_length_scales_still_propose_inside_the_box() {
    let history = rising([1e-4; 5]);
    let bounds = SearchBounds::unit(1);
    let tuned = ion_optimizer::OptimizerConfig::builder()
        .kernel_length_scales(vec![0.05])
        .risk_tolerance(0.5)
        .optimize_length_scales(true)
        .build()
        .unwrap();
    let a = next_point_query(&history, &tuned, &bounds, 42).unwrap();
    let b = next_point_query(&history, &tuned, &bounds, 42).unwrap();
    assert_eq!(a, b);
    assert!(bounds.contains(&a.point));
    assert!(tuned.noise_candidates().contains(&a.selected_noise));
}
