//! Pre-flight validation of an observation.
//!
//! Runs before any fitting and fails fast with a message naming the array
//! and the violated constraint. Nothing is repaired.

use tracing::debug;

use crate::data::FilterBank;
use crate::domain::{Observation, Photometry, Spectrum};
use crate::error::SedError;

/// Rest-frame wavelength (um) above which a point counts as far-IR.
pub const FIR_REST_WAVELENGTH: f64 = 60.0;

/// Minimum photometric points without a spectrum.
const MIN_PHOTOMETRY: usize = 3;

fn check_lengths(what: &str, arrays: &[(&str, usize)]) -> Result<(), SedError> {
    let (first_name, first_len) = arrays[0];
    for &(name, len) in &arrays[1..] {
        if len != first_len {
            return Err(SedError::invalid(format!(
                "{what}: `{name}` has {len} values but `{first_name}` has {first_len}"
            )));
        }
    }
    Ok(())
}

fn check_values(what: &str, name: &str, values: &[f64]) -> Result<(), SedError> {
    if let Some(i) = values.iter().position(|v| v.is_nan()) {
        return Err(SedError::invalid(format!("{what}: `{name}` contains NaN at index {i}")));
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(SedError::invalid(format!("{what}: `{name}` is not finite at index {i}")));
    }
    if let Some(i) = values.iter().position(|&v| v < 0.0) {
        return Err(SedError::invalid(format!(
            "{what}: `{name}` has a negative value ({}) at index {i}",
            values[i]
        )));
    }
    Ok(())
}

fn check_ascending(what: &str, wavelength: &[f64]) -> Result<(), SedError> {
    if let Some(i) = wavelength.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SedError::invalid(format!(
            "{what}: wavelengths must be in strictly ascending order ({} then {} at index {})",
            wavelength[i],
            wavelength[i + 1],
            i + 1
        )));
    }
    Ok(())
}

/// Log-space likelihoods need detections with positive flux and uncertainty,
/// and upper limits with a positive value.
fn check_detections(
    what: &str,
    flux: &[f64],
    err: &[f64],
    upper: Option<&[bool]>,
) -> Result<(), SedError> {
    for i in 0..flux.len() {
        if upper.is_some_and(|u| u[i]) {
            if flux[i] <= 0.0 {
                return Err(SedError::invalid(format!(
                    "{what}: upper limit at index {i} must be > 0 (flux={})",
                    flux[i]
                )));
            }
            continue;
        }
        if flux[i] <= 0.0 || err[i] <= 0.0 {
            return Err(SedError::invalid(format!(
                "{what}: detection at index {i} needs flux > 0 and uncertainty > 0 \
                 (flux={}, eflux={})",
                flux[i],
                err[i]
            )));
        }
    }
    Ok(())
}

fn validate_photometry(phot: &Photometry, bank: &FilterBank) -> Result<(), SedError> {
    let what = "photometry";
    check_lengths(
        what,
        &[
            ("wavelength", phot.wavelength.len()),
            ("flux", phot.flux.len()),
            ("eflux", phot.flux_err.len()),
            ("filter", phot.filter.len()),
            ("upper_limit", phot.upper_limit.len()),
        ],
    )?;
    check_values(what, "wavelength", &phot.wavelength)?;
    check_values(what, "flux", &phot.flux)?;
    check_values(what, "eflux", &phot.flux_err)?;
    check_ascending(what, &phot.wavelength)?;
    check_detections(what, &phot.flux, &phot.flux_err, Some(&phot.upper_limit))?;
    for name in &phot.filter {
        bank.get(name)?;
    }
    Ok(())
}

fn validate_spectrum(spec: &Spectrum) -> Result<(), SedError> {
    let what = "spectrum";
    check_lengths(
        what,
        &[
            ("wavelength", spec.wavelength.len()),
            ("flux", spec.flux.len()),
            ("eflux", spec.flux_err.len()),
        ],
    )?;
    if spec.is_empty() {
        return Err(SedError::invalid("spectrum: no points"));
    }
    check_values(what, "wavelength", &spec.wavelength)?;
    check_values(what, "flux", &spec.flux)?;
    check_values(what, "eflux", &spec.flux_err)?;
    check_ascending(what, &spec.wavelength)?;
    check_detections(what, &spec.flux, &spec.flux_err, None)
}

/// Check an observation against the filter bank before fitting.
pub fn validate_observation(obs: &Observation, bank: &FilterBank) -> Result<(), SedError> {
    if !(obs.redshift.is_finite() && obs.redshift > 0.0) {
        return Err(SedError::invalid(format!(
            "redshift must be finite and > 0, got {}",
            obs.redshift
        )));
    }

    validate_photometry(&obs.photometry, bank)?;
    if let Some(spec) = &obs.spectrum {
        validate_spectrum(spec)?;
    } else {
        let n = obs.photometry.len();
        if n < MIN_PHOTOMETRY {
            return Err(SedError::invalid(format!(
                "photometry: {n} points without a spectrum; at least {MIN_PHOTOMETRY} are required"
            )));
        }
        if n == MIN_PHOTOMETRY {
            let fir = obs
                .photometry
                .wavelength
                .iter()
                .filter(|&&l| l / (1.0 + obs.redshift) > FIR_REST_WAVELENGTH)
                .count();
            if fir == 0 || fir == n {
                return Err(SedError::invalid(format!(
                    "photometry: with exactly {n} points, at least one but not all must lie \
                     above {FIR_REST_WAVELENGTH} um rest frame ({fir} do)"
                )));
            }
        }
    }

    debug!(
        redshift = obs.redshift,
        photometry = obs.photometry.len(),
        spectrum = obs.spectrum.as_ref().map_or(0, Spectrum::len),
        upper_limits = obs.photometry.n_upper_limits(),
        "observation validated"
    );
    Ok(())
}
