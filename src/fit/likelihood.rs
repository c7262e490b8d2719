//! Log-likelihood of model fluxes against censored flux measurements.
//!
//! Both terms work in log10-flux space:
//!
//! - detections: Gaussian with `σ = 0.434 · err / obs` (the log10 error)
//! - upper limits: probability that the true flux lies below the limit given
//!   0.15 dex log-normal scatter, `ln(½ erfc x)`
//!
//! A non-positive model flux at a detection has no log10 and yields `-inf`;
//! callers treat non-finite values as rejected fits.

use crate::domain::Observation;
use crate::math::ln_erfc;

/// `log10(e)`: converts a relative error to a log10 error.
const LOG10_E: f64 = 0.434;
/// Log-normal scatter assumed for upper limits (dex).
const UPPER_LIMIT_SCATTER_DEX: f64 = 0.15;

/// Weighted Gaussian log-likelihood of detections in log10 flux.
pub fn detection_loglikelihood(model: &[f64], obs: &[f64], err: &[f64], weights: &[f64]) -> f64 {
    debug_assert!(model.len() == obs.len() && obs.len() == err.len() && err.len() == weights.len());
    let mut total = 0.0;
    for i in 0..model.len() {
        if !(model[i] > 0.0) {
            return f64::NEG_INFINITY;
        }
        let sigma = LOG10_E * err[i] / obs[i];
        let d = obs[i].log10() - model[i].log10();
        total += weights[i] * (-0.5 * d * d / (sigma * sigma));
    }
    total
}

/// Log-probability that each true flux lies below its stated limit.
pub fn upper_limit_loglikelihood(model: &[f64], limit: &[f64]) -> f64 {
    debug_assert_eq!(model.len(), limit.len());
    let scale = std::f64::consts::SQRT_2 * UPPER_LIMIT_SCATTER_DEX;
    model
        .iter()
        .zip(limit)
        .map(|(&m, &l)| {
            if m <= 0.0 {
                // Nothing predicted: certainly below the limit.
                return 0.0;
            }
            let x = (m.log10() - l.log10()) / scale;
            ln_erfc(x) - std::f64::consts::LN_2
        })
        .sum()
}

/// Detections plus upper limits over a full observation.
///
/// `predicted` holds photometry first, then spectral points. Spectral points
/// are detections weighted by `spectrum_weight`.
pub fn combined_loglikelihood(obs: &Observation, predicted: &[f64], spectrum_weight: f64) -> f64 {
    let phot = &obs.photometry;
    let n_phot = phot.len();
    debug_assert_eq!(predicted.len(), obs.n_points());

    let mut det_model = Vec::with_capacity(predicted.len());
    let mut det_obs = Vec::with_capacity(predicted.len());
    let mut det_err = Vec::with_capacity(predicted.len());
    let mut det_w = Vec::with_capacity(predicted.len());
    let mut ul_model = Vec::new();
    let mut ul_limit = Vec::new();

    for i in 0..n_phot {
        if phot.upper_limit[i] {
            ul_model.push(predicted[i]);
            ul_limit.push(phot.flux[i]);
        } else {
            det_model.push(predicted[i]);
            det_obs.push(phot.flux[i]);
            det_err.push(phot.flux_err[i]);
            det_w.push(1.0);
        }
    }
    if let Some(spec) = &obs.spectrum {
        det_model.extend_from_slice(&predicted[n_phot..]);
        det_obs.extend_from_slice(&spec.flux);
        det_err.extend_from_slice(&spec.flux_err);
        det_w.extend(std::iter::repeat_n(spectrum_weight, spec.len()));
    }

    detection_loglikelihood(&det_model, &det_obs, &det_err, &det_w)
        + upper_limit_loglikelihood(&ul_model, &ul_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Photometry;

    #[test]
    fn detection_peaks_at_observed_flux() {
        let obs = [2.0, 5.0];
        let err = [0.2, 0.5];
        let w = [1.0, 1.0];
        assert_eq!(detection_loglikelihood(&obs, &obs, &err, &w), 0.0);

        let mut prev = f64::NEG_INFINITY;
        for scale in [0.3, 0.6, 0.9, 0.99] {
            let model: Vec<f64> = obs.iter().map(|o| o * scale).collect();
            let ll = detection_loglikelihood(&model, &obs, &err, &w);
            assert!(ll < 0.0 && ll > prev, "scale {scale}: {ll}");
            prev = ll;
        }
    }

    #[test]
    fn detection_uses_log10_sigma() {
        // One point off by exactly one log10 sigma => -0.5.
        let sigma = LOG10_E * 0.1;
        let model = 10f64.powf(-sigma);
        let ll = detection_loglikelihood(&[model], &[1.0], &[0.1], &[1.0]);
        assert!((ll + 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_positive_model_is_rejected() {
        assert_eq!(
            detection_loglikelihood(&[0.0], &[1.0], &[0.1], &[1.0]),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn upper_limit_decreases_above_limit() {
        let mut prev = upper_limit_loglikelihood(&[1.0], &[1.0]);
        assert!((prev - 0.5f64.ln()).abs() < 1e-6);
        for m in [1.5, 3.0, 10.0, 100.0, 1e4] {
            let ll = upper_limit_loglikelihood(&[m], &[1.0]);
            assert!(ll < prev && ll.is_finite(), "model {m}: {ll}");
            prev = ll;
        }
        // Far below the limit costs nothing.
        assert!(upper_limit_loglikelihood(&[1e-6], &[1.0]).abs() < 1e-9);
    }

    #[test]
    fn combined_splits_detections_and_limits() {
        let obs = Observation {
            redshift: 0.1,
            spectrum: None,
            photometry: Photometry {
                wavelength: vec![24.0, 70.0],
                flux: vec![1.0, 2.0],
                flux_err: vec![0.1, 0.2],
                filter: vec!["MIPS24".into(), "PACS70".into()],
                upper_limit: vec![false, true],
            },
        };
        let predicted = [1.0, 2.0];
        let ll = combined_loglikelihood(&obs, &predicted, 1.0);
        assert!((ll - 0.5f64.ln()).abs() < 1e-6);
    }
}
