mod errors;
mod properties;
mod scenarios;

use ion_optimizer::{ObservationHistory, OptimizerConfig};

/// Five evenly spaced settings on `[0, 0.8]` with a linearly rising objective.
pub(crate) fn rising(stability: [f64; 5]) -> ObservationHistory {
    ObservationHistory::from_parts(
        (0..5).map(|i| vec![f64::from(i) * 0.2]).collect(),
        vec![0.1, 0.325, 0.55, 0.775, 1.0],
        stability.to_vec(),
    )
    .unwrap()
}

pub(crate) fn config(risk: f64) -> OptimizerConfig {
    OptimizerConfig::builder()
        .kernel_length_scales(vec![0.3])
        .risk_tolerance(risk)
        .build()
        .unwrap()
}
