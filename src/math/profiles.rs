//! Line-shape and continuum primitives used to build model curves.
//!
//! - `gaussian_profile`: Gaussian in log10 wavelength, unit maximum
//! - `drude`: Drude resonance, unit maximum at its center
//! - `broken_powerlaw`: smooth double-broken power law, exactly 1 at 10 um
//!
//! Wavelengths are rest-frame microns throughout.

/// Center (um) and width (dex) of the 11 um silicate emission feature.
pub const SI11_CENTER: f64 = 11.0;
pub const SI11_WIDTH_DEX: f64 = 0.05;
/// Center (um) and width (dex) of the 18 um silicate emission feature.
pub const SI18_CENTER: f64 = 18.0;
pub const SI18_WIDTH_DEX: f64 = 0.07;

/// Normalization wavelength of [`broken_powerlaw`].
pub const BPL_NORM_WAVELENGTH: f64 = 10.0;

/// Second break, far-IR slope, transition sharpness and anchor of the AGN
/// continuum.
pub const AGN_PL_SECOND_BREAK: f64 = 40.0;
pub const AGN_PL_FIR_SLOPE: f64 = -3.5;
pub const AGN_PL_SMOOTHNESS: f64 = 2.0;
pub const AGN_PL_ANCHOR: f64 = 15.0;

/// Log-Gaussian with unit maximum at `mu`; `sigma` in dex.
pub fn gaussian_profile(x: f64, mu: f64, sigma: f64) -> f64 {
    let d = x.log10() - mu.log10();
    (-0.5 * d * d / (sigma * sigma)).exp()
}

/// Drude profile with fractional width `gamma`, peaking at 1 at `center`.
pub fn drude(x: f64, gamma: f64, center: f64) -> f64 {
    let u = x / center - center / x;
    let g2 = gamma * gamma;
    g2 / (u * u + g2)
}

/// Drude profile over a grid.
///
/// With `normed`, the samples are divided by their maximum so the curve peaks
/// at exactly 1 even when the center falls between grid points.
pub fn drude_profile(x: &[f64], gamma: f64, center: f64, normed: bool) -> Vec<f64> {
    let mut out: Vec<f64> = x.iter().map(|&v| drude(v, gamma, center)).collect();
    if normed {
        let peak = out.iter().copied().fold(0.0, f64::max);
        if peak > 0.0 {
            out.iter_mut().for_each(|v| *v /= peak);
        }
    }
    out
}

/// Smooth single-break power law, 1 at the break.
///
/// Slope `slope1` well below `x_break`, `slope2` well above; `s` sets the
/// sharpness of the transition.
pub fn smooth_broken_powerlaw(x: f64, x_break: f64, slope1: f64, slope2: f64, s: f64) -> f64 {
    let r = x / x_break;
    r.powf(slope1) * (0.5 * (1.0 + r.powf(s))).powf((slope2 - slope1) / s)
}

fn double_break_raw(x: f64, break1: f64, break2: f64, slopes: [f64; 3], s: f64) -> f64 {
    let join = 0.5 * (break1 + break2);
    if x <= join {
        smooth_broken_powerlaw(x, break1, slopes[0], slopes[1], s)
    } else {
        let first = smooth_broken_powerlaw(join, break1, slopes[0], slopes[1], s);
        let second = smooth_broken_powerlaw(join, break2, slopes[1], slopes[2], s);
        smooth_broken_powerlaw(x, break2, slopes[1], slopes[2], s) * first / second
    }
}

/// Double-broken power law normalized to 1 at [`BPL_NORM_WAVELENGTH`].
///
/// Two single-break segments are joined at the midpoint of the breaks, the
/// second rescaled to match the first there.
pub fn broken_powerlaw(
    x: f64,
    break1: f64,
    break2: f64,
    slope1: f64,
    slope2: f64,
    slope3: f64,
    s: f64,
) -> f64 {
    let slopes = [slope1, slope2, slope3];
    double_break_raw(x, break1, break2, slopes, s)
        / double_break_raw(BPL_NORM_WAVELENGTH, break1, break2, slopes, s)
}

/// AGN continuum shape, 1 at the 15 um anchor.
pub fn agn_powerlaw(x: f64, l_break: f64, alpha1: f64, alpha2: f64) -> f64 {
    let eval = |v: f64| {
        broken_powerlaw(
            v,
            l_break,
            AGN_PL_SECOND_BREAK,
            alpha1,
            alpha2,
            AGN_PL_FIR_SLOPE,
            AGN_PL_SMOOTHNESS,
        )
    };
    eval(x) / eval(AGN_PL_ANCHOR)
}
