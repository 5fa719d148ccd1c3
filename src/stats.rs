//! Normal distribution helpers and small sample statistics.

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart / Abramowitz-Stegun rational approximation).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

/// Probability mass of `N(mean, std²)` lying above `threshold`.
///
/// A zero (or numerically vanishing) standard deviation collapses the
/// Gaussian onto its mean, so the result is then 0 or 1.
pub(crate) fn upper_tail(mean: f64, std: f64, threshold: f64) -> f64 {
    if !mean.is_finite() || !std.is_finite() {
        return 1.0;
    }
    if std < 1e-12 {
        return if mean > threshold { 1.0 } else { 0.0 };
    }
    1.0 - norm_cdf((threshold - mean) / std)
}

/// Population standard deviation (divides by `n`).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
