//! Silicate extinction curve, shaped after Kemper et al. (2004).
//!
//! Expressed as `τ(λ)/τ(9.7 um)`:
//!
//! - below 8 um: continuum rising as `λ^-1.7`, matched to the core at 8 um
//! - 8 – 12.7 um: Gaussian core centered on 9.7 um
//! - above 12.7 um: 18 um Drude feature plus a steep decaying continuum,
//!   matched to the core at 12.7 um
//!
//! The curve is tabulated on a fixed log grid (1 – 1000 um) and linearly
//! interpolated onto the caller's wavelengths; it is flat beyond the grid ends.

use crate::math::{drude, interp};

const GRID_MIN_UM: f64 = 1.0;
const GRID_MAX_UM: f64 = 1000.0;
const GRID_POINTS: usize = 2000;

const CORE_CENTER: f64 = 9.7;
const CORE_SIGMA: f64 = 1.6;
const CORE_LO: f64 = 8.0;
const CORE_HI: f64 = 12.7;
const CONTINUUM_SLOPE: f64 = -1.7;

const FEATURE18_CENTER: f64 = 18.0;
const FEATURE18_GAMMA: f64 = 0.35;
const FEATURE18_DEPTH: f64 = 0.45;
const TAIL_SLOPE: f64 = -4.0;

fn core(lambda: f64) -> f64 {
    let d = lambda - CORE_CENTER;
    (-0.5 * d * d / (CORE_SIGMA * CORE_SIGMA)).exp()
}

/// Piecewise profile evaluated directly (rest-frame microns).
fn profile(lambda: f64) -> f64 {
    if lambda <= CORE_LO {
        core(CORE_LO) * (lambda / CORE_LO).powf(CONTINUUM_SLOPE)
    } else if lambda <= CORE_HI {
        core(lambda)
    } else {
        let feature = |l: f64| FEATURE18_DEPTH * drude(l, FEATURE18_GAMMA, FEATURE18_CENTER);
        let residual = core(CORE_HI) - feature(CORE_HI);
        feature(lambda) + residual * (lambda / CORE_HI).powf(TAIL_SLOPE)
    }
}

fn internal_grid() -> (Vec<f64>, Vec<f64>) {
    let ln_min = GRID_MIN_UM.ln();
    let step = (GRID_MAX_UM.ln() - ln_min) / (GRID_POINTS as f64 - 1.0);
    let wav: Vec<f64> = (0..GRID_POINTS)
        .map(|i| (ln_min + step * i as f64).exp())
        .collect();
    let tau = wav.iter().map(|&l| profile(l)).collect();
    (wav, tau)
}

/// `τ(λ)/τ(9.7)` on the given wavelengths (microns).
pub fn silicate_extinction_curve(wavelength: &[f64]) -> Vec<f64> {
    let (grid, tau) = internal_grid();
    wavelength.iter().map(|&l| interp(l, &grid, &tau)).collect()
}

/// Transmission `exp(-tau9p7 · τ(λ)/τ(9.7))`.
pub fn silicate_attenuation(wavelength: &[f64], tau9p7: f64) -> Vec<f64> {
    if tau9p7 == 0.0 {
        return vec![1.0; wavelength.len()];
    }
    silicate_extinction_curve(wavelength)
        .into_iter()
        .map(|t| (-tau9p7 * t).exp())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaks_near_nine_point_seven() {
        let curve = silicate_extinction_curve(&[9.7, 8.5, 11.5, 18.0, 30.0]);
        assert!((curve[0] - 1.0).abs() < 1e-3, "tau(9.7) = {}", curve[0]);
        for &v in &curve[1..] {
            assert!(v < curve[0]);
        }
        // The 18 um feature stands above the surrounding continuum.
        assert!(curve[3] > curve[4]);
    }

    #[test]
    fn is_continuous_at_piece_boundaries() {
        for edge in [CORE_LO, CORE_HI] {
            let lo = profile(edge * (1.0 - 1e-9));
            let hi = profile(edge * (1.0 + 1e-9));
            assert!((lo - hi).abs() < 1e-6, "jump at {edge}: {lo} vs {hi}");
        }
    }

    #[test]
    fn is_flat_beyond_grid() {
        let curve = silicate_extinction_curve(&[1000.0, 5000.0]);
        assert_eq!(curve[0], curve[1]);
    }

    #[test]
    fn zero_depth_is_transparent() {
        let t = silicate_attenuation(&[5.0, 9.7, 20.0], 0.0);
        assert_eq!(t, vec![1.0, 1.0, 1.0]);
        let t = silicate_attenuation(&[9.7], 1.0);
        assert!((t[0] - (-1.0f64).exp()).abs() < 1e-3);
    }
}
