//! Complementary error function.
//!
//! Rational Chebyshev approximation (Numerical Recipes `erfcc`, in the
//! Abramowitz–Stegun family) with fractional error below 1.2e-7 everywhere.
//! The exponent is kept separate so `ln_erfc` stays finite far in the tail,
//! where `erfc` itself underflows to 0.

/// `ln(t)` and the exponent of `erfc(|x|) = t · exp(exponent)`.
fn erfc_parts(x: f64) -> (f64, f64) {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    (t.ln(), -z * z + poly)
}

/// Complementary error function.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let (ln_t, exponent) = erfc_parts(x);
    let tail = (ln_t + exponent).exp();
    if x >= 0.0 { tail } else { 2.0 - tail }
}

/// Natural log of `erfc(x)`, finite for all finite `x`.
pub fn ln_erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let (ln_t, exponent) = erfc_parts(x);
    if x >= 0.0 {
        ln_t + exponent
    } else {
        (2.0 - (ln_t + exponent).exp()).ln()
    }
}
