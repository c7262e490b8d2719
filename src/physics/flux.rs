//! Conversions between rest-frame luminosity densities and observed fluxes.
//!
//! Units:
//! - wavelengths in microns (rest frame unless stated otherwise)
//! - `nuLnu` in solar luminosities
//! - observed flux densities in Jansky
//! - band luminosities in solar luminosities

use crate::data::filters::Filter;
use crate::domain::Band;
use crate::error::SedError;
use crate::math::{trapz, trapz_variance};
use crate::physics::cosmology::Cosmology;

/// Speed of light (m/s).
pub const SPEED_OF_LIGHT: f64 = 2.997_924_58e8;
/// Nominal solar luminosity (W), IAU 2015.
pub const L_SUN_W: f64 = 3.828e26;
/// One megaparsec in metres.
pub const MPC_M: f64 = 3.085_677_581_491_367e22;
/// One Jansky in W m^-2 Hz^-1.
pub const JANSKY: f64 = 1e-26;

/// Frequency (Hz) of a wavelength in microns.
pub fn frequency_hz(wavelength_um: f64) -> f64 {
    SPEED_OF_LIGHT / (wavelength_um * 1e-6)
}

/// `(1+z) / (4π d_L²)` in m^-2.
fn dilution(cosmo: &Cosmology, z: f64) -> f64 {
    let dl = cosmo.luminosity_distance_mpc(z) * MPC_M;
    (1.0 + z) / (4.0 * std::f64::consts::PI * dl * dl)
}

/// Rest-frame `nuLnu` (Lsun) at redshift `z` to observed `F_nu` (Jy).
///
/// `F_nu = L_nu / (4π d_L²/(1+z))` with `L_nu = nuLnu / nu_rest`. The output
/// is aligned element-wise with `rest_wavelength`.
pub fn nu_lnu_to_observed_flux(
    cosmo: &Cosmology,
    rest_wavelength: &[f64],
    nu_lnu: &[f64],
    z: f64,
) -> Vec<f64> {
    let k = dilution(cosmo, z) * L_SUN_W / JANSKY;
    rest_wavelength
        .iter()
        .zip(nu_lnu)
        .map(|(&l, &v)| v / frequency_hz(l) * k)
        .collect()
}

/// Inverse of [`nu_lnu_to_observed_flux`].
pub fn observed_flux_to_nu_lnu(
    cosmo: &Cosmology,
    rest_wavelength: &[f64],
    flux_jy: &[f64],
    z: f64,
) -> Vec<f64> {
    let k = dilution(cosmo, z) * L_SUN_W / JANSKY;
    rest_wavelength
        .iter()
        .zip(flux_jy)
        .map(|(&l, &f)| f * frequency_hz(l) / k)
        .collect()
}

/// Synthetic photometry of a rest-frame model through a filter.
///
/// Converts to observed flux, redshifts the grid by `(1+z)`, then takes the
/// QE-weighted frequency average over the passband.
pub fn synthetic_filter_flux(
    cosmo: &Cosmology,
    filter: &Filter,
    rest_wavelength: &[f64],
    nu_lnu: &[f64],
    z: f64,
) -> Result<f64, SedError> {
    let flux = nu_lnu_to_observed_flux(cosmo, rest_wavelength, nu_lnu, z);
    let observed: Vec<f64> = rest_wavelength.iter().map(|&l| l * (1.0 + z)).collect();
    filter.band_average(&observed, &flux)
}

/// Trapezoidal `∫ L_nu dnu` over an ascending frequency window.
pub fn integrate_luminosity(nu: &[f64], l_nu: &[f64]) -> f64 {
    trapz(nu, l_nu)
}

/// Frequency window of a band: ascending `nu` and the matching `L_nu`
/// (and its error) in Lsun/Hz, taken from a rest-frame `nuLnu` curve.
fn band_window(
    rest_wavelength: &[f64],
    nu_lnu: &[f64],
    nu_lnu_err: Option<&[f64]>,
    band: Band,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let (lo, hi) = band.bounds_um();
    let mut nu = Vec::new();
    let mut l_nu = Vec::new();
    let mut err = Vec::new();
    for i in (0..rest_wavelength.len()).rev() {
        let l = rest_wavelength[i];
        if l < lo || l > hi {
            continue;
        }
        let f = frequency_hz(l);
        nu.push(f);
        l_nu.push(nu_lnu[i] / f);
        err.push(nu_lnu_err.map_or(0.0, |e| e[i] / f));
    }
    (nu, l_nu, err)
}

/// Band luminosity (Lsun) of a rest-frame `nuLnu` curve.
pub fn band_luminosity(rest_wavelength: &[f64], nu_lnu: &[f64], band: Band) -> f64 {
    let (nu, l_nu, _) = band_window(rest_wavelength, nu_lnu, None, band);
    integrate_luminosity(&nu, &l_nu)
}

/// Band luminosity (Lsun) and its 1σ error from per-point `nuLnu` errors.
///
/// The error uses the discretized-trapezoid propagation, pairing adjacent
/// points on the integration grid.
pub fn band_luminosity_with_error(
    rest_wavelength: &[f64],
    nu_lnu: &[f64],
    nu_lnu_err: &[f64],
    band: Band,
) -> (f64, f64) {
    let (nu, l_nu, err) = band_window(rest_wavelength, nu_lnu, Some(nu_lnu_err), band);
    (
        integrate_luminosity(&nu, &l_nu),
        trapz_variance(&nu, &err).sqrt(),
    )
}
