//! Tunes the simulated two-knob ion source for a fixed number of steps.
//!
//! ```sh
//! RUST_LOG=ion_optimizer=debug cargo run --example ecris_loop --features tracing
//! ```

use ion_optimizer::plant::IonSourceSim;
use ion_optimizer::prelude::*;
use tracing_subscriber::EnvFilter;

const STEPS: usize = 15;
const MAX_READINGS: usize = 500;
const TRANSITION_TIMEOUT: usize = 5_000;
const MEASUREMENT_NOISE: f64 = 1e3;
const SLOPE_MAX: f64 = 1e-3;

/// Moves the source to `target`, waits for the transient to settle, then
/// measures at the new setting. Readings arrive at irregular intervals.
fn settle_and_measure(
    source: &mut IonSourceSim,
    rng: &mut fastrand::Rng,
    target: [f64; 2],
) -> Estimate {
    let mut filter =
        KalmanFilter::new(source.transition(target), MEASUREMENT_NOISE).with_slope_max(SLOPE_MAX);
    let mut steps = 0;
    while steps < TRANSITION_TIMEOUT && !filter.is_settled() {
        filter.update_with_dt(source.transition(target), 0.5 + rng.f64());
        steps += 1;
    }
    source.set_state(target);

    filter.reset();
    for _ in 0..MAX_READINGS {
        filter.update_with_dt(source.read(), 0.5 + rng.f64());
        if filter.is_settled() {
            break;
        }
    }
    filter.estimate().unwrap_or(Estimate {
        mean: filter.level(),
        std: 0.0,
    })
}

fn main() -> ion_optimizer::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = OptimizerConfig::builder()
        .kernel_length_scales(vec![0.25, 0.25])
        .exploration_bias(2.0)
        .risk_tolerance(0.3)
        .instability_threshold(0.05)
        .build()?;
    let bounds = SearchBounds::unit(2);
    let mut optimizer = StabilityOptimizer::with_seed(config, 1);
    let mut source = IonSourceSim::with_seed([0.1, 0.1], 2);
    let mut timing = fastrand::Rng::with_seed(3);
    let mut history = ObservationHistory::new();

    for setting in [[0.1, 0.1], [0.8, 0.2], [0.2, 0.8]] {
        let est = settle_and_measure(&mut source, &mut timing, setting);
        history.push(setting.to_vec(), est.mean, est.stability())?;
    }

    for step in 0..STEPS {
        let proposal = optimizer.next_point(&history, &bounds)?;
        if !proposal.is_admissible() {
            println!("step {step:2}: no admissible setting, loosening risk tolerance");
            let risk = (optimizer.config().risk_tolerance() + 0.1).min(1.0);
            let loosened = optimizer.config().with_risk_tolerance(risk)?;
            *optimizer.config_mut() = loosened;
            continue;
        }
        optimizer.record(&proposal);

        let target = [proposal.point[0], proposal.point[1]];
        let est = settle_and_measure(&mut source, &mut timing, target);
        println!(
            "step {step:2}: setting ({:.3}, {:.3})  current {:.4}  rel. noise {:.4}  P(unstable) {:.3}",
            target[0],
            target[1],
            est.mean,
            est.stability(),
            proposal.instability_probability,
        );
        history.push(proposal.point, est.mean, est.stability())?;
    }

    let best = history
        .objective()
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    if let Some(i) = best {
        println!(
            "best setting {:?} with current {:.4}",
            history.settings()[i],
            history.objective()[i]
        );
    }
    Ok(())
}
