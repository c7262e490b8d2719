//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::data::{FilterBank, TemplateStore};
use crate::domain::{CandidateModel, Observation};
use crate::error::SedError;
use crate::models::predict_observables;
use crate::physics::Cosmology;

/// Observed vs. predicted flux at one data point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    /// Filter name, or `spec` for spectral points.
    pub source: String,
    /// Observed-frame wavelength (um).
    pub wavelength: f64,
    pub observed: f64,
    pub model: f64,
    pub upper_limit: bool,
    /// `(observed - model) / uncertainty`; `None` for upper limits.
    pub sigma: Option<f64>,
}

/// Residuals of a fitted model at every data point, photometry first.
pub fn compute_residuals(
    cosmo: &Cosmology,
    store: &TemplateStore,
    bank: &FilterBank,
    obs: &Observation,
    model: &CandidateModel,
) -> Result<Vec<PointResidual>, SedError> {
    let predicted = predict_observables(cosmo, store, bank, obs, model)?;
    if predicted.iter().any(|v| !v.is_finite()) {
        return Err(SedError::numerical(format!(
            "non-finite prediction for model {}",
            model.label()
        )));
    }

    let phot = &obs.photometry;
    let mut out = Vec::with_capacity(predicted.len());
    for i in 0..phot.len() {
        let upper = phot.upper_limit[i];
        out.push(PointResidual {
            source: phot.filter[i].clone(),
            wavelength: phot.wavelength[i],
            observed: phot.flux[i],
            model: predicted[i],
            upper_limit: upper,
            sigma: (!upper).then(|| (phot.flux[i] - predicted[i]) / phot.flux_err[i]),
        });
    }
    if let Some(spec) = &obs.spectrum {
        for (i, &model_flux) in predicted[phot.len()..].iter().enumerate() {
            out.push(PointResidual {
                source: "spec".to_string(),
                wavelength: spec.wavelength[i],
                observed: spec.flux[i],
                model: model_flux,
                upper_limit: false,
                sigma: Some((spec.flux[i] - model_flux) / spec.flux_err[i]),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::tests::toy_bank;
    use crate::data::templates::tests::toy_store;
    use crate::data::{simulate_photometry, FilterName, SampleConfig};

    #[test]
    fn noise_free_observation_has_zero_residuals() {
        let (store, bank, cosmo) = (toy_store(), toy_bank(), Cosmology::wmap9());
        let model = CandidateModel {
            galaxy_template: "gal_2".into(),
            log_norm_dust: 0.9,
            log_norm_pah: 0.1,
            tau9p7: 0.3,
            agn: None,
            loglikelihood: 0.0,
            k: 3,
            n: 4,
        };
        let cfg = SampleConfig {
            scatter_dex: 0.0,
            ..SampleConfig::default()
        };
        let filters = [
            FilterName::Mips24,
            FilterName::Pacs70,
            FilterName::Pacs160,
            FilterName::Spire250,
        ];
        let mut obs =
            simulate_photometry(&cosmo, &store, &bank, &model, 0.2, &filters, &cfg).unwrap();
        obs.photometry.upper_limit[3] = true;

        let residuals = compute_residuals(&cosmo, &store, &bank, &obs, &model).unwrap();
        assert_eq!(residuals.len(), 4);
        assert_eq!(residuals[0].source, "MIPS24");
        for r in &residuals[..3] {
            let sigma = r.sigma.unwrap();
            assert!(sigma.abs() < 1e-6, "{}: {sigma}", r.source);
        }
        assert_eq!(residuals[3].sigma, None);
    }
}
