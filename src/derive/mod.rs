//! Derived physical quantities for each candidate model.
//!
//! Per model:
//!
//! 1. rebuild the intrinsic host (dust + PAH, errors in quadrature)
//! 2. rebuild the AGN component when present
//! 3. integrate both over the IR / MIR / FIR bands; host errors use the
//!    discretized-trapezoid propagation
//! 4. AGN fraction per band (0 when the AGN is off)
//! 5. SFR from the host IR luminosity, and its Akaike-weighted share
//!
//! The per-model luminosities are never averaged; only `wSFR` carries the
//! model weight, and the summary sums it over the set.

use tracing::debug;

use crate::data::TemplateStore;
use crate::domain::{Band, CandidateModel, DerivedQuantities, DerivedSummary, ModelSelection};
use crate::error::SedError;
use crate::models::{agn_curve, galaxy_curve};
use crate::physics::{band_luminosity, band_luminosity_with_error};

/// SFR per Lsun of host IR luminosity (Chabrier IMF).
pub const SFR_PER_LSUN: f64 = 1.09e-10;

/// Log10 band luminosity and its error in dex.
fn log_luminosity(lum: f64, err: f64, what: &str) -> Result<(f64, f64), SedError> {
    if !(lum.is_finite() && lum > 0.0) {
        return Err(SedError::numerical(format!("{what} luminosity is not positive: {lum}")));
    }
    Ok((lum.log10(), err / (lum * std::f64::consts::LN_10)))
}

/// `10^agn / (10^agn + 10^host)`, or 0 for the AGN-off sentinel.
pub fn agn_fraction(loglum_agn: f64, loglum_host: f64) -> f64 {
    if loglum_agn == 0.0 {
        return 0.0;
    }
    let agn = 10f64.powf(loglum_agn);
    agn / (agn + 10f64.powf(loglum_host))
}

/// Derived quantities for one model with Akaike weight `aw`.
pub fn derive_model(
    store: &TemplateStore,
    model: &CandidateModel,
    aw: f64,
    best_model: bool,
) -> Result<DerivedQuantities, SedError> {
    let wav = store.wavelength();
    let host = galaxy_curve(store, model, false)?;

    let mut host_log = [(0.0, 0.0); 3];
    for (slot, band) in host_log.iter_mut().zip(Band::ALL) {
        let (lum, err) = band_luminosity_with_error(wav, &host.nu_lnu, &host.nu_lnu_err, band);
        *slot = log_luminosity(lum, err, &format!("host {}", band.label()))?;
    }

    let mut agn_log = [0.0; 3];
    if let Some(agn) = &model.agn {
        let curve = agn_curve(store, agn)?;
        for (slot, band) in agn_log.iter_mut().zip(Band::ALL) {
            let label = format!("AGN {}", band.label());
            *slot = log_luminosity(band_luminosity(wav, &curve, band), 0.0, &label)?.0;
        }
    }

    let [ir, mir, fir] = host_log;
    let sfr = SFR_PER_LSUN * 10f64.powf(ir.0);
    let e_sfr = sfr * std::f64::consts::LN_10 * ir.1;

    Ok(DerivedQuantities {
        label: model.label(),
        agn_on: model.agn_on(),
        aw,
        best_model,
        loglum_host_ir: ir.0,
        e_loglum_host_ir: ir.1,
        loglum_host_mir: mir.0,
        e_loglum_host_mir: mir.1,
        loglum_host_fir: fir.0,
        e_loglum_host_fir: fir.1,
        loglum_agn_ir: agn_log[0],
        loglum_agn_mir: agn_log[1],
        loglum_agn_fir: agn_log[2],
        agn_frac_ir: agn_fraction(agn_log[0], ir.0),
        agn_frac_mir: agn_fraction(agn_log[1], mir.0),
        agn_frac_fir: agn_fraction(agn_log[2], fir.0),
        sfr,
        e_sfr,
        w_sfr: aw * sfr,
        e_w_sfr: aw * e_sfr,
    })
}

/// Derive every model in a selected set, plus the model-averaged SFR.
pub fn derive_all(
    store: &TemplateStore,
    models: &[CandidateModel],
    selection: &ModelSelection,
) -> Result<(Vec<DerivedQuantities>, DerivedSummary), SedError> {
    if models.len() != selection.weights.len() {
        return Err(SedError::invalid(format!(
            "{} models but {} Akaike weights",
            models.len(),
            selection.weights.len()
        )));
    }
    if models.is_empty() {
        return Err(SedError::InsufficientData("no models to derive".into()));
    }

    let rows = models
        .iter()
        .zip(&selection.weights)
        .enumerate()
        .map(|(i, (m, &aw))| derive_model(store, m, aw, selection.is_best(i)))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = summarize(&rows, &models[selection.best].label());
    debug!(
        sfr = summary.sfr_averaged,
        e_sfr = summary.e_sfr_averaged,
        "derived quantities"
    );
    Ok((rows, summary))
}

/// `Σ wSFR` with the `ewSFR` terms added in quadrature.
pub fn summarize(rows: &[DerivedQuantities], best_label: &str) -> DerivedSummary {
    DerivedSummary {
        best_label: best_label.to_string(),
        sfr_averaged: rows.iter().map(|r| r.w_sfr).sum(),
        e_sfr_averaged: rows.iter().map(|r| r.e_w_sfr * r.e_w_sfr).sum::<f64>().sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::templates::tests::toy_store;
    use crate::domain::{AgnComponent, AnalyticAgn, TemplateAgn};

    fn model(agn: Option<AgnComponent>) -> CandidateModel {
        CandidateModel {
            galaxy_template: "gal_1".into(),
            log_norm_dust: 0.7,
            log_norm_pah: 0.3,
            tau9p7: 1.5,
            agn,
            loglikelihood: -4.0,
            k: 3,
            n: 9,
        }
    }

    fn template_agn() -> AgnComponent {
        AgnComponent::Template(TemplateAgn {
            continuum: "AGN_1".into(),
            silicate: "AGN_1Siem".into(),
            log_norm_continuum: 0.2,
            log_norm_silicate: -0.5,
        })
    }

    #[test]
    fn agn_off_gives_zero_sentinels() {
        let d = derive_model(&toy_store(), &model(None), 1.0, true).unwrap();
        assert_eq!(
            (d.loglum_agn_ir, d.loglum_agn_mir, d.loglum_agn_fir),
            (0.0, 0.0, 0.0)
        );
        assert_eq!((d.agn_frac_ir, d.agn_frac_mir, d.agn_frac_fir), (0.0, 0.0, 0.0));
        assert!(!d.agn_on);
    }

    #[test]
    fn agn_fractions_are_in_unit_interval() {
        let store = toy_store();
        let analytic = AgnComponent::Analytic(AnalyticAgn {
            log_norm_si11: 8.5,
            log_norm_si18: 8.2,
            log_norm_pl: 10.0,
            l_break: 20.0,
            alpha1: 0.5,
            alpha2: 1.0,
        });
        for agn in [template_agn(), analytic] {
            let d = derive_model(&store, &model(Some(agn)), 0.5, false).unwrap();
            for f in [d.agn_frac_ir, d.agn_frac_mir, d.agn_frac_fir] {
                assert!((0.0..=1.0).contains(&f) && f > 0.0, "fraction {f}");
            }
        }
    }

    #[test]
    fn sfr_follows_host_ir_luminosity() {
        let d = derive_model(&toy_store(), &model(Some(template_agn())), 0.25, false).unwrap();
        let sfr = 1.09e-10 * 10f64.powf(d.loglum_host_ir);
        assert!((d.sfr - sfr).abs() <= 1e-12 * sfr);
        let want = sfr * std::f64::consts::LN_10 * d.e_loglum_host_ir;
        assert!((d.e_sfr - want).abs() <= 1e-12 * sfr);
        assert!((d.w_sfr - 0.25 * d.sfr).abs() <= 1e-12 * sfr);
        assert!((d.e_w_sfr - 0.25 * d.e_sfr).abs() <= 1e-12 * sfr);
    }

    #[test]
    fn host_luminosity_ignores_attenuation() {
        let store = toy_store();
        let mut clear = model(None);
        clear.tau9p7 = 0.0;
        let a = derive_model(&store, &clear, 1.0, true).unwrap();
        let b = derive_model(&store, &model(None), 1.0, true).unwrap();
        assert_eq!(a.loglum_host_mir, b.loglum_host_mir);
        assert!(a.e_loglum_host_ir > 0.0);
    }

    #[test]
    fn derive_all_sums_weighted_sfr() {
        let store = toy_store();
        let models = vec![model(None), model(Some(template_agn()))];
        let selection = ModelSelection {
            aic: vec![10.0, 11.0],
            weights: vec![0.6, 0.4],
            best: 0,
            corrected: true,
        };
        let (rows, summary) = derive_all(&store, &models, &selection).unwrap();
        assert!(rows[0].best_model && !rows[1].best_model);
        let want: f64 = rows.iter().map(|r| r.w_sfr).sum();
        assert!((summary.sfr_averaged - want).abs() <= 1e-12 * want);
        assert_eq!(summary.best_label, "gal_1");

        let short = ModelSelection {
            weights: vec![1.0],
            ..selection
        };
        assert!(derive_all(&store, &models, &short).is_err());
    }
}
