//! Parameter grids for the reference fitter.
//!
//! Nonlinear parameters (silicate depth, AGN break wavelength and slopes) are
//! searched on a deterministic grid; normalizations are solved exactly at
//! each point. A grid search has no local minima to get stuck in and gives
//! the same answer for the same inputs and flags.

use crate::domain::FitConfig;
use crate::error::SedError;

/// `steps` evenly spaced points from `min` to `max` inclusive.
///
/// A single step yields `[min]`.
pub fn lin_space(min: f64, max: f64, steps: usize, what: &str) -> Result<Vec<f64>, SedError> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(SedError::invalid(format!(
            "invalid {what} range: min={min}, max={max} (must be finite and max>=min)"
        )));
    }
    if steps == 0 {
        return Err(SedError::invalid(format!("{what} steps must be >= 1")));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }
    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

/// Silicate optical depths searched for the host component.
pub fn tau_grid(config: &FitConfig) -> Result<Vec<f64>, SedError> {
    if config.tau_min < 0.0 {
        return Err(SedError::invalid("tau9p7 must be >= 0"));
    }
    lin_space(config.tau_min, config.tau_max, config.tau_steps, "tau9p7")
}

/// Shape of the analytic AGN power law at one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawShape {
    pub l_break: f64,
    pub alpha1: f64,
    pub alpha2: f64,
}

/// Cartesian product of break wavelengths and the two slopes.
pub fn powerlaw_grid(config: &FitConfig) -> Result<Vec<PowerLawShape>, SedError> {
    if config.l_break_min <= 0.0 {
        return Err(SedError::invalid("lBreak must be > 0"));
    }
    let breaks = lin_space(config.l_break_min, config.l_break_max, config.l_break_steps, "lBreak")?;
    let alphas = lin_space(config.alpha_min, config.alpha_max, config.alpha_steps, "alpha")?;

    let mut out = Vec::with_capacity(breaks.len() * alphas.len() * alphas.len());
    for &l_break in &breaks {
        for &alpha1 in &alphas {
            for &alpha2 in &alphas {
                out.push(PowerLawShape {
                    l_break,
                    alpha1,
                    alpha2,
                });
            }
        }
    }
    Ok(out)
}
