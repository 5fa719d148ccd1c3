/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Draw a uniform point in the unit cube `[0, 1)^dims`.
pub(crate) fn unit_point(rng: &mut fastrand::Rng, dims: usize) -> Vec<f64> {
    (0..dims).map(|_| f64_range(rng, 0.0, 1.0)).collect()
}

/// Sample from the standard normal distribution (Box-Muller).
pub(crate) fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // 1 - u keeps the argument of ln strictly positive.
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
}
