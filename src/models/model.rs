//! Component reconstruction for a candidate model.
//!
//! Curves live on the template store's rest-frame grid:
//! - host: dust continuum + PAH, optionally attenuated by the silicate
//!   extinction curve
//! - AGN: analytic (silicate Gaussians + broken power law) or template pair
//!
//! `Observer` projects any rest-frame curve onto an observation's data points
//! (synthetic photometry first, then the spectrum), which is what both the
//! fitter and the synthetic sample generator need.

use crate::data::{Filter, FilterBank, TemplateStore};
use crate::domain::{AgnComponent, CandidateModel, Observation};
use crate::error::SedError;
use crate::math::{
    agn_powerlaw, gaussian_profile, interp_many, SI11_CENTER, SI11_WIDTH_DEX, SI18_CENTER,
    SI18_WIDTH_DEX,
};
use crate::physics::{nu_lnu_to_observed_flux, silicate_attenuation, Cosmology};

/// A host curve with its per-point 1σ uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCurve {
    pub nu_lnu: Vec<f64>,
    pub nu_lnu_err: Vec<f64>,
}

/// Scaled template: `10^log_norm · template`.
fn scaled(values: &[f64], log_norm: f64) -> Vec<f64> {
    let a = 10f64.powf(log_norm);
    values.iter().map(|v| a * v).collect()
}

/// Host-galaxy component (dust + PAH).
///
/// The uncertainty combines the two scaled template errors in quadrature.
/// With `attenuated`, both value and error are multiplied by the silicate
/// transmission at `tau9p7`.
pub fn galaxy_curve(
    store: &TemplateStore,
    model: &CandidateModel,
    attenuated: bool,
) -> Result<HostCurve, SedError> {
    let dust = store.get(&model.galaxy_template)?;
    let pah = store.pah()?;

    let a = 10f64.powf(model.log_norm_dust);
    let b = 10f64.powf(model.log_norm_pah);
    let mut nu_lnu: Vec<f64> = dust
        .nu_lnu
        .iter()
        .zip(&pah.nu_lnu)
        .map(|(d, p)| a * d + b * p)
        .collect();
    let mut nu_lnu_err: Vec<f64> = dust
        .nu_lnu_err
        .iter()
        .zip(&pah.nu_lnu_err)
        .map(|(d, p)| (a * d).hypot(b * p))
        .collect();

    if attenuated && model.tau9p7 != 0.0 {
        let transmission = silicate_attenuation(store.wavelength(), model.tau9p7);
        for ((v, e), t) in nu_lnu.iter_mut().zip(&mut nu_lnu_err).zip(&transmission) {
            *v *= t;
            *e *= t;
        }
    }
    Ok(HostCurve { nu_lnu, nu_lnu_err })
}

/// 11 um and 18 um silicate emission profiles on a grid (unit maxima).
pub fn silicate_emission_profiles(wavelength: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let si11 = wavelength
        .iter()
        .map(|&l| gaussian_profile(l, SI11_CENTER, SI11_WIDTH_DEX))
        .collect();
    let si18 = wavelength
        .iter()
        .map(|&l| gaussian_profile(l, SI18_CENTER, SI18_WIDTH_DEX))
        .collect();
    (si11, si18)
}

/// AGN power law, 1 at its 15 um anchor, on a grid.
pub fn agn_powerlaw_curve(wavelength: &[f64], l_break: f64, alpha1: f64, alpha2: f64) -> Vec<f64> {
    wavelength
        .iter()
        .map(|&l| agn_powerlaw(l, l_break, alpha1, alpha2))
        .collect()
}

/// AGN component. The one place the two reconstruction modes diverge.
pub fn agn_curve(store: &TemplateStore, agn: &AgnComponent) -> Result<Vec<f64>, SedError> {
    let wav = store.wavelength();
    match agn {
        AgnComponent::Analytic(p) => {
            let (si11, si18) = silicate_emission_profiles(wav);
            let pl = agn_powerlaw_curve(wav, p.l_break, p.alpha1, p.alpha2);
            let (a, b, c) = (
                10f64.powf(p.log_norm_si11),
                10f64.powf(p.log_norm_si18),
                10f64.powf(p.log_norm_pl),
            );
            Ok((0..wav.len())
                .map(|i| a * si11[i] + b * si18[i] + c * pl[i])
                .collect())
        }
        AgnComponent::Template(t) => {
            let continuum = store.get(&t.continuum)?;
            let silicate = store.get(&t.silicate)?;
            let c = scaled(&continuum.nu_lnu, t.log_norm_continuum);
            let s = scaled(&silicate.nu_lnu, t.log_norm_silicate);
            Ok(c.iter().zip(&s).map(|(x, y)| x + y).collect())
        }
    }
}

/// Observed-frame model: attenuated host plus AGN (when on).
pub fn total_curve(store: &TemplateStore, model: &CandidateModel) -> Result<Vec<f64>, SedError> {
    let mut total = galaxy_curve(store, model, true)?.nu_lnu;
    if let Some(agn) = &model.agn {
        for (t, a) in total.iter_mut().zip(agn_curve(store, agn)?) {
            *t += a;
        }
    }
    Ok(total)
}

/// Maps rest-frame `nuLnu` curves to an observation's data points (Jy).
///
/// Redshift-dependent factors and filter lookups are resolved once, so the
/// fitter can project many component curves cheaply.
#[derive(Debug)]
pub struct Observer<'a> {
    rest_wavelength: &'a [f64],
    observed_wavelength: Vec<f64>,
    /// Jy per Lsun of `nuLnu` at each rest-frame grid point.
    grid_factor: Vec<f64>,
    filters: Vec<&'a Filter>,
    spectrum_rest: Vec<f64>,
}

impl<'a> Observer<'a> {
    /// Fails when a photometric filter is unknown or its passband falls
    /// outside the redshifted template grid.
    pub fn new(
        cosmo: &Cosmology,
        bank: &'a FilterBank,
        rest_wavelength: &'a [f64],
        obs: &Observation,
    ) -> Result<Self, SedError> {
        let z = obs.redshift;
        let unit = vec![1.0; rest_wavelength.len()];
        let grid_factor = nu_lnu_to_observed_flux(cosmo, rest_wavelength, &unit, z);
        let observed_wavelength: Vec<f64> =
            rest_wavelength.iter().map(|&l| l * (1.0 + z)).collect();

        let filters = obs
            .photometry
            .filter
            .iter()
            .map(|name| bank.get(name))
            .collect::<Result<Vec<_>, _>>()?;
        for filter in &filters {
            filter.band_average(&observed_wavelength, &grid_factor)?;
        }

        let spectrum_rest = obs
            .spectrum
            .as_ref()
            .map(|s| s.wavelength.iter().map(|&l| l / (1.0 + z)).collect())
            .unwrap_or_default();

        Ok(Self {
            rest_wavelength,
            observed_wavelength,
            grid_factor,
            filters,
            spectrum_rest,
        })
    }

    pub fn n_photometry(&self) -> usize {
        self.filters.len()
    }

    pub fn n_spectrum(&self) -> usize {
        self.spectrum_rest.len()
    }

    /// Model fluxes at every data point: photometry, then spectrum.
    pub fn observe(&self, nu_lnu: &[f64]) -> Result<Vec<f64>, SedError> {
        let flux: Vec<f64> = nu_lnu.iter().zip(&self.grid_factor).map(|(v, k)| v * k).collect();
        let mut out = Vec::with_capacity(self.n_photometry() + self.n_spectrum());
        for filter in &self.filters {
            out.push(filter.band_average(&self.observed_wavelength, &flux)?);
        }
        out.extend(interp_many(&self.spectrum_rest, self.rest_wavelength, &flux));
        Ok(out)
    }
}

/// Predicted data points for a full candidate model.
pub fn predict_observables(
    cosmo: &Cosmology,
    store: &TemplateStore,
    bank: &FilterBank,
    obs: &Observation,
    model: &CandidateModel,
) -> Result<Vec<f64>, SedError> {
    let observer = Observer::new(cosmo, bank, store.wavelength(), obs)?;
    observer.observe(&total_curve(store, model)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::tests::toy_bank;
    use crate::data::templates::tests::toy_store;
    use crate::domain::{AnalyticAgn, Photometry, Spectrum, TemplateAgn};

    fn host_only(tau9p7: f64) -> CandidateModel {
        CandidateModel {
            galaxy_template: "gal_1".into(),
            log_norm_dust: 0.5,
            log_norm_pah: 0.2,
            tau9p7,
            agn: None,
            loglikelihood: 0.0,
            k: 3,
            n: 0,
        }
    }

    #[test]
    fn galaxy_error_is_quadrature_sum() {
        let store = toy_store();
        let curve = galaxy_curve(&store, &host_only(0.0), false).unwrap();
        let dust = store.get("gal_1").unwrap();
        let pah = store.pah().unwrap();
        let i = 150;
        let a = 10f64.powf(0.5) * dust.nu_lnu_err[i];
        let b = 10f64.powf(0.2) * pah.nu_lnu_err[i];
        let want = (a * a + b * b).sqrt();
        assert!((curve.nu_lnu_err[i] - want).abs() <= 1e-12 * curve.nu_lnu_err[i]);
        assert!(curve.nu_lnu_err[i] < a + b);
    }

    #[test]
    fn attenuation_only_dims_the_host() {
        let store = toy_store();
        let clear = galaxy_curve(&store, &host_only(2.0), false).unwrap();
        let dimmed = galaxy_curve(&store, &host_only(2.0), true).unwrap();
        for (c, d) in clear.nu_lnu.iter().zip(&dimmed.nu_lnu) {
            assert!(d <= c);
        }
        let i97 = store.wavelength().partition_point(|&l| l < 9.7);
        assert!(dimmed.nu_lnu[i97] < 0.2 * clear.nu_lnu[i97]);
    }

    #[test]
    fn agn_modes_dispatch_to_their_own_shapes() {
        let store = toy_store();
        let analytic = AgnComponent::Analytic(AnalyticAgn {
            log_norm_si11: -10.0,
            log_norm_si18: -10.0,
            log_norm_pl: 0.0,
            l_break: 20.0,
            alpha1: 0.8,
            alpha2: 0.2,
        });
        let curve = agn_curve(&store, &analytic).unwrap();
        let i15 = store.wavelength().partition_point(|&l| l < 15.0);
        let l = store.wavelength()[i15];
        assert!((curve[i15] - agn_powerlaw(l, 20.0, 0.8, 0.2)).abs() < 1e-9);

        let template = AgnComponent::Template(TemplateAgn {
            continuum: "AGN_1".into(),
            silicate: "AGN_1Siem".into(),
            log_norm_continuum: 0.0,
            log_norm_silicate: 0.0,
        });
        let curve = agn_curve(&store, &template).unwrap();
        let c = store.get("AGN_1").unwrap();
        let s = store.get("AGN_1Siem").unwrap();
        assert_eq!(curve[i15], c.nu_lnu[i15] + s.nu_lnu[i15]);
    }

    #[test]
    fn observer_projects_photometry_then_spectrum() {
        let store = toy_store();
        let bank = toy_bank();
        let cosmo = Cosmology::wmap9();
        let obs = Observation {
            redshift: 0.1,
            spectrum: Some(Spectrum {
                wavelength: vec![8.0, 12.0, 20.0],
                flux: vec![0.1, 0.2, 0.3],
                flux_err: vec![0.01, 0.01, 0.01],
            }),
            photometry: Photometry {
                wavelength: vec![24.0, 100.0],
                flux: vec![1.0, 2.0],
                flux_err: vec![0.1, 0.2],
                filter: vec!["MIPS24".into(), "PACS100".into()],
                upper_limit: vec![false, false],
            },
        };

        let pred = predict_observables(&cosmo, &store, &bank, &obs, &host_only(0.5)).unwrap();
        assert_eq!(pred.len(), 5);
        assert!(pred.iter().all(|v| v.is_finite() && *v > 0.0));

        // Linear in the curve.
        let observer = Observer::new(&cosmo, &bank, store.wavelength(), &obs).unwrap();
        let curve = total_curve(&store, &host_only(0.5)).unwrap();
        let doubled: Vec<f64> = curve.iter().map(|v| 2.0 * v).collect();
        let once = observer.observe(&curve).unwrap();
        let twice = observer.observe(&doubled).unwrap();
        for (a, b) in once.iter().zip(&twice) {
            assert!((2.0 * a - b).abs() <= 1e-12 * b);
        }
    }

    #[test]
    fn unknown_filter_fails_before_fitting() {
        let store = toy_store();
        let bank = toy_bank();
        let obs = Observation {
            redshift: 0.1,
            spectrum: None,
            photometry: Photometry {
                wavelength: vec![3.6],
                flux: vec![1.0],
                flux_err: vec![0.1],
                filter: vec!["IRAC1".into()],
                upper_limit: vec![false],
            },
        };
        let err = Observer::new(&Cosmology::wmap9(), &bank, store.wavelength(), &obs).unwrap_err();
        assert!(matches!(err, SedError::UnknownFilter(_)));
    }
}
