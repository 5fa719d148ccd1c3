//! Closed-loop runs against the simulated ion source.

use ion_optimizer::plant::IonSourceSim;
use ion_optimizer::prelude::*;

const SLOPE_MAX: f64 = 1e-3;
const MAX_READINGS: usize = 200;
const TRANSITION_TIMEOUT: usize = 5_000;

/// Reads the source until the filter settles and returns `(objective, stability)`.
fn measure(source: &mut IonSourceSim) -> (f64, f64) {
    let mut filter = KalmanFilter::new(source.read(), 1e3).with_slope_max(SLOPE_MAX);
    for _ in 0..MAX_READINGS {
        filter.update(source.read());
        if filter.is_settled() {
            break;
        }
    }
    let est = filter.estimate().unwrap();
    (est.mean, est.stability())
}

#[test]
fn loop_improves_on_the_starting_point() {
    let config = OptimizerConfig::builder()
        .kernel_length_scales(vec![0.3, 0.3])
        .risk_tolerance(0.5)
        .build()
        .unwrap();
    let bounds = SearchBounds::unit(2);
    let mut optimizer = StabilityOptimizer::with_seed(config, 2024);
    let mut source = IonSourceSim::with_seed([0.1, 0.1], 17);

    let initial = [[0.1, 0.1], [0.9, 0.2], [0.2, 0.9]];
    let initial_best = initial
        .iter()
        .map(|&s| source.beam_mean(s))
        .fold(f64::NEG_INFINITY, f64::max);

    let mut history = ObservationHistory::new();
    for setting in initial {
        source.set_state(setting);
        let (objective, stability) = measure(&mut source);
        history.push(setting.to_vec(), objective, stability).unwrap();
    }

    for _ in 0..8 {
        let proposal = optimizer.next_point(&history, &bounds).unwrap();
        assert!(bounds.contains(&proposal.point));
        optimizer.record(&proposal);

        let setting = [proposal.point[0], proposal.point[1]];
        source.set_state(setting);
        let (objective, stability) = measure(&mut source);
        history.push(proposal.point, objective, stability).unwrap();
    }

    assert_eq!(history.len(), 11);
    let best = history
        .settings()
        .iter()
        .map(|s| source.beam_mean([s[0], s[1]]))
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(best > initial_best, "best {best} vs start {initial_best}");
}

#[test]
fn transitions_settle_before_measuring() {
    let mut source = IonSourceSim::with_seed([0.1, 0.1], 3);
    let target = [0.5, 0.3];
    let start = source.beam_mean([0.1, 0.1]);
    let end = source.beam_mean(target);

    let mut filter =
        KalmanFilter::new(source.transition(target), 1e3).with_slope_max(SLOPE_MAX);
    let mut steps = 0;
    while steps < TRANSITION_TIMEOUT {
        filter.update(source.transition(target));
        steps += 1;
        if filter.is_settled() {
            break;
        }
    }
    assert!(steps > 20 && steps < TRANSITION_TIMEOUT, "steps {steps}");
    // Settled on the slow tail of the transient, past the midpoint.
    let level = filter.level();
    assert!(level > start + 0.5 * (end - start), "level {level}");
    assert!(level < end + 0.05, "level {level}");

    source.set_state(target);
    assert_eq!(source.state(), target);
    let (objective, stability) = measure(&mut source);
    assert!((objective - end).abs() < 0.02);
    assert!(stability.abs() < 0.01);
}

#[test]
fn unstable_pocket_reports_relative_spread() {
    let mut source = IonSourceSim::with_seed([0.6, 0.6], 5);
    let (objective, stability) = measure(&mut source);
    let noise = source.noise_amplitude([0.6, 0.6]);
    let expected = noise / source.beam_mean([0.6, 0.6]);
    assert!(objective > 0.7);
    assert!(
        stability > 0.4 * expected && stability < 1.6 * expected,
        "stability {stability} vs {expected}"
    );
}
