//! Trapezoidal quadrature and linear interpolation on tabulated curves.
//!
//! All helpers assume `x` is strictly ascending; callers validate that once
//! (templates at load time, observations in the pre-flight validator).

/// Trapezoidal integral of `y` over `x`.
///
/// Returns 0 for fewer than two points.
pub fn trapz(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

/// Variance of the trapezoidal integral given independent per-point errors.
///
/// Each interval contributes `(Δx²/4)(σ_i² + σ_{i+1}²)`.
pub fn trapz_variance(x: &[f64], sigma: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), sigma.len());
    x.windows(2)
        .zip(sigma.windows(2))
        .map(|(xs, ss)| {
            let dx = xs[1] - xs[0];
            0.25 * dx * dx * (ss[0] * ss[0] + ss[1] * ss[1])
        })
        .sum()
}

/// Linear interpolation at `x`, clamped to the end values outside the table.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }

    // First index with xs[i] > x; x is strictly inside so 1 <= hi <= n-1.
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let span = xs[hi] - xs[lo];
    if span <= 0.0 {
        return ys[lo];
    }
    let u = (x - xs[lo]) / span;
    ys[lo] + u * (ys[hi] - ys[lo])
}

/// Vectorized [`interp`].
pub fn interp_many(x_new: &[f64], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    x_new.iter().map(|&x| interp(x, xs, ys)).collect()
}
