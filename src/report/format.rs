//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting and derivation code stays clean and testable
//! - output changes are localized

use crate::domain::{
    AgnComponent, CandidateModel, DerivedQuantities, DerivedSummary, FitConfig, Observation,
};
use crate::fit::FitSelection;
use crate::report::PointResidual;

/// Format the fit summary: observation, candidate table, skipped combinations.
pub fn format_fit_summary(obs: &Observation, result: &FitSelection, config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== sedsep - IR SED decomposition ===\n");
    out.push_str(&format!("Redshift: {}\n", obs.redshift));
    out.push_str(&format!(
        "Points: photometry={} (upper limits={}) | spectrum={}\n",
        obs.photometry.len(),
        obs.photometry.n_upper_limits(),
        obs.spectrum.as_ref().map_or(0, |s| s.len()),
    ));
    out.push_str(&format!(
        "AGN mode: {:?} | criterion: {}\n",
        result.mode,
        if result.selection.corrected { "AICc" } else { "AIC" }
    ));
    if config.corrected && !result.selection.corrected {
        out.push_str("(AICc undefined for at least one model; plain AIC used)\n");
    }

    out.push_str("\nCandidates:\n");
    out.push_str(&format_candidates(&result.models, result));
    for (label, reason) in &result.skipped {
        out.push_str(&format!("  (skipped {label}) {reason}\n"));
    }

    out.push_str("\nBest model:\n");
    out.push_str(&format_model(result.best()));
    out
}

fn format_candidates(models: &[CandidateModel], result: &FitSelection) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<28} {:>7} {:>4} {:>4} {:>11} {:>10} {:>8}\n",
        "model", "tau9p7", "k", "n", "logl", "AICc", "Aw"
    ));
    out.push_str(&format!(
        "  {:-<28} {:->7} {:->4} {:->4} {:->11} {:->10} {:->8}\n",
        "", "", "", "", "", "", ""
    ));
    for (i, m) in models.iter().enumerate() {
        let chosen = if result.selection.is_best(i) { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<28} {:>7.3} {:>4} {:>4} {:>11.3} {:>10.3} {:>8.4}\n",
            truncate(&m.label(), 28),
            m.tau9p7,
            m.k,
            m.n,
            m.loglikelihood,
            result.selection.aic[i],
            result.selection.weights[i],
        ));
    }
    out
}

fn format_model(m: &CandidateModel) -> String {
    let mut out = String::new();
    out.push_str(&format!("- galaxy: {}\n", m.galaxy_template));
    out.push_str(&format!(
        "- log norms: dust={:.4} PAH={:.4} | tau9p7={:.3}\n",
        m.log_norm_dust, m.log_norm_pah, m.tau9p7
    ));
    match &m.agn {
        None => out.push_str("- AGN: off\n"),
        Some(AgnComponent::Template(t)) => out.push_str(&format!(
            "- AGN: {} (log norm {:.4}) + {} (log norm {:.4})\n",
            t.continuum, t.log_norm_continuum, t.silicate, t.log_norm_silicate
        )),
        Some(AgnComponent::Analytic(p)) => out.push_str(&format!(
            "- AGN: power law log norm {:.4}, lBreak={:.2} um, alpha1={:.3}, alpha2={:.3}; \
             Si11={:.4} Si18={:.4}\n",
            p.log_norm_pl, p.l_break, p.alpha1, p.alpha2, p.log_norm_si11, p.log_norm_si18
        )),
    }
    out
}

/// Format the per-point residual table of one model.
pub fn format_residuals(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<12} {:>10} {:>12} {:>12} {:>8}\n",
        "source", "lambda", "observed", "model", "sigma"
    ));
    for r in rows {
        let sigma = match r.sigma {
            Some(s) => format!("{s:>8.2}"),
            None => format!("{:>8}", "<limit"),
        };
        out.push_str(&format!(
            "  {:<12} {:>10.3} {:>12.4e} {:>12.4e} {sigma}\n",
            truncate(&r.source, 12),
            r.wavelength,
            r.observed,
            r.model,
        ));
    }
    out
}

/// Format derived quantities: the best model's luminosities plus the
/// model-averaged SFR.
pub fn format_derived(rows: &[DerivedQuantities], summary: &DerivedSummary) -> String {
    let mut out = String::new();
    out.push_str("Derived quantities (log10 Lsun):\n");
    if let Some(best) = rows.iter().find(|r| r.best_model) {
        out.push_str(&format!("- best model: {} (Aw={:.4})\n", best.label, best.aw));
        out.push_str(&format!("  {:<5} {:>14} {:>8} {:>8}\n", "band", "host", "AGN", "fAGN"));
        let b = best;
        for (band, host, e_host, agn, frac) in [
            ("IR", b.loglum_host_ir, b.e_loglum_host_ir, b.loglum_agn_ir, b.agn_frac_ir),
            ("MIR", b.loglum_host_mir, b.e_loglum_host_mir, b.loglum_agn_mir, b.agn_frac_mir),
            ("FIR", b.loglum_host_fir, b.e_loglum_host_fir, b.loglum_agn_fir, b.agn_frac_fir),
        ] {
            let agn = if best.agn_on { format!("{agn:>8.3}") } else { format!("{:>8}", "-") };
            out.push_str(&format!("  {band:<5} {host:>7.3}+/-{e_host:<5.3} {agn} {frac:>8.3}\n"));
        }
        out.push_str(&format!("  SFR: {:.3} +/- {:.3} Msun/yr\n", best.sfr, best.e_sfr));
    }
    out.push_str(&format!(
        "- model-averaged SFR: {:.3} +/- {:.3} Msun/yr over {} models\n",
        summary.sfr_averaged,
        summary.e_sfr_averaged,
        rows.len()
    ));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgnReconstructionMode, ModelSelection, TemplateAgn};

    fn candidate(name: &str, agn: Option<AgnComponent>) -> CandidateModel {
        CandidateModel {
            galaxy_template: name.into(),
            log_norm_dust: 9.0,
            log_norm_pah: 8.0,
            tau9p7: 0.5,
            agn,
            loglikelihood: -3.25,
            k: 3,
            n: 8,
        }
    }

    fn selection() -> FitSelection {
        let agn = AgnComponent::Template(TemplateAgn {
            continuum: "AGN_1".into(),
            silicate: "AGN_1Siem".into(),
            log_norm_continuum: 9.5,
            log_norm_silicate: 8.1,
        });
        FitSelection {
            mode: AgnReconstructionMode::Template,
            models: vec![candidate("gal_1", None), candidate("gal_1", Some(agn))],
            selection: ModelSelection {
                aic: vec![16.1, 19.4],
                weights: vec![0.84, 0.16],
                best: 0,
                corrected: true,
            },
            skipped: vec![("gal_2+AGN_1".into(), "no grid point".into())],
        }
    }

    #[test]
    fn summary_marks_best_and_lists_skipped() {
        let obs = Observation {
            redshift: 0.1,
            spectrum: None,
            photometry: Default::default(),
        };
        let text = format_fit_summary(&obs, &selection(), &FitConfig::default());
        assert!(text.contains("criterion: AICc"));
        assert!(text.contains("* gal_1 "));
        assert!(text.contains("  gal_1+AGN_1"));
        assert!(text.contains("(skipped gal_2+AGN_1) no grid point"));
        assert!(text.contains("- AGN: off"));
    }

    #[test]
    fn derived_block_hides_agn_luminosity_when_off() {
        let row = DerivedQuantities {
            label: "gal_1".into(),
            agn_on: false,
            aw: 1.0,
            best_model: true,
            loglum_host_ir: 11.0,
            e_loglum_host_ir: 0.01,
            loglum_host_mir: 10.0,
            e_loglum_host_mir: 0.02,
            loglum_host_fir: 10.9,
            e_loglum_host_fir: 0.01,
            loglum_agn_ir: 0.0,
            loglum_agn_mir: 0.0,
            loglum_agn_fir: 0.0,
            agn_frac_ir: 0.0,
            agn_frac_mir: 0.0,
            agn_frac_fir: 0.0,
            sfr: 10.9,
            e_sfr: 0.25,
            w_sfr: 10.9,
            e_w_sfr: 0.25,
        };
        let summary = DerivedSummary {
            best_label: "gal_1".into(),
            sfr_averaged: 10.9,
            e_sfr_averaged: 0.25,
        };
        let text = format_derived(&[row], &summary);
        assert!(text.contains("best model: gal_1"));
        assert!(text.contains("model-averaged SFR: 10.900 +/- 0.250"));
        assert!(text.contains("       -    0.000"), "{text}");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("gal_1", 12), "gal_1");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
    }
}
