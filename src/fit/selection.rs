//! Model selection over the candidate set using AIC / AICc and Akaike weights.
//!
//! For each fitted candidate:
//! - AIC = 2k - 2 ln L
//! - AICc = AIC + (2k² + 2k) / (n - k - 1)
//!
//! Selection rules:
//! 1. The small-sample correction is applied to all models or to none. If any
//!    model has `n - k <= 1` the whole set falls back to plain AIC.
//! 2. The best model has the minimum score; ties go to the lowest index.
//! 3. Akaike weights `exp(-Δ/2) / Σ exp(-Δ/2)` with `Δ` relative to the best.

use tracing::{debug, info, warn};

use crate::data::{FilterBank, TemplateStore};
use crate::domain::{
    AgnReconstructionMode, CandidateModel, FitConfig, ModelSelection, Observation, TemplateKind,
};
use crate::error::SedError;
use crate::fit::fitter::{fit_candidate, AgnChoice, FitContext};
use crate::physics::Cosmology;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub mode: AgnReconstructionMode,
    /// Fitted candidates, in enumeration order.
    pub models: Vec<CandidateModel>,
    pub selection: ModelSelection,
    /// Combinations that could not be fitted and why (for diagnostics).
    pub skipped: Vec<(String, String)>,
}

impl FitSelection {
    pub fn best(&self) -> &CandidateModel {
        &self.models[self.selection.best]
    }
}

/// Score a candidate set and compute Akaike weights.
///
/// `loglik`, `k` and `n` are parallel arrays, one entry per model. Models with
/// a non-finite score get zero weight; at least one finite score is required.
pub fn select_models(
    loglik: &[f64],
    k: &[usize],
    n: &[usize],
    corrected: bool,
) -> Result<ModelSelection, SedError> {
    if loglik.is_empty() {
        return Err(SedError::InsufficientData("no candidate models to select from".into()));
    }
    if k.len() != loglik.len() || n.len() != loglik.len() {
        return Err(SedError::invalid(format!(
            "selection inputs differ in length: loglik={}, k={}, n={}",
            loglik.len(),
            k.len(),
            n.len()
        )));
    }

    let degenerate = k.iter().zip(n).any(|(&k, &n)| n <= k + 1);
    let apply = corrected && !degenerate;
    if corrected && degenerate {
        debug!("AICc correction undefined for at least one model; using AIC for all");
    }

    let aic: Vec<f64> = loglik
        .iter()
        .zip(k.iter().zip(n))
        .map(|(&ll, (&k, &n))| {
            let kf = k as f64;
            let base = 2.0 * kf - 2.0 * ll;
            if apply {
                base + (2.0 * kf * kf + 2.0 * kf) / (n as f64 - kf - 1.0)
            } else {
                base
            }
        })
        .collect();

    let mut best: Option<usize> = None;
    for (i, &a) in aic.iter().enumerate() {
        if a.is_finite() && best.is_none_or(|b| a < aic[b]) {
            best = Some(i);
        }
    }
    let Some(best) = best else {
        return Err(SedError::numerical("no candidate model has a finite AIC"));
    };

    let raw: Vec<f64> = aic
        .iter()
        .map(|&a| {
            if a.is_finite() {
                (-0.5 * (a - aic[best])).exp()
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = raw.iter().sum();
    let weights = raw.iter().map(|w| w / total).collect();

    Ok(ModelSelection {
        aic,
        weights,
        best,
        corrected: apply,
    })
}

/// Fit every candidate combination for an observation and select among them.
///
/// Candidates are each galaxy dust template alone and, with `with_agn`, each
/// galaxy template paired with every AGN option of the resolved mode.
pub fn fit_and_select(
    cosmo: &Cosmology,
    store: &TemplateStore,
    bank: &FilterBank,
    obs: &Observation,
    config: &FitConfig,
) -> Result<FitSelection, SedError> {
    let mode = config.mode.resolve(obs.spectrum.is_some());
    let ctx = FitContext::new(cosmo, store, bank, obs, config)?;

    let mut agn_choices = vec![AgnChoice::Off];
    if config.with_agn {
        match mode {
            AgnReconstructionMode::Analytic => agn_choices.push(AgnChoice::Analytic),
            AgnReconstructionMode::Template => {
                let pairs = store.agn_pairs();
                if pairs.is_empty() {
                    warn!("template store has no AGN continuum/silicate pair; fitting hosts only");
                }
                agn_choices.extend(
                    pairs
                        .into_iter()
                        .map(|(continuum, silicate)| AgnChoice::Template { continuum, silicate }),
                );
            }
        }
    }

    let mut models = Vec::new();
    let mut skipped = Vec::new();
    for galaxy in store.of_kind(TemplateKind::GalaxyDust) {
        for &agn in &agn_choices {
            let label = match agn {
                AgnChoice::Off => galaxy.name.clone(),
                AgnChoice::Analytic => format!("{}+PL", galaxy.name),
                AgnChoice::Template { continuum, .. } => {
                    format!("{}+{}", galaxy.name, continuum.name)
                }
            };
            match fit_candidate(&ctx, galaxy, agn) {
                Ok(model) => models.push(model),
                Err(e @ (SedError::InsufficientData(_) | SedError::Numerical(_))) => {
                    debug!(candidate = %label, reason = %e, "skipped candidate");
                    skipped.push((label, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
    }

    if models.is_empty() {
        return Err(SedError::InsufficientData(format!(
            "no candidate model could be fitted ({} skipped)",
            skipped.len()
        )));
    }

    let loglik: Vec<f64> = models.iter().map(|m| m.loglikelihood).collect();
    let k: Vec<usize> = models.iter().map(|m| m.k).collect();
    let n: Vec<usize> = models.iter().map(|m| m.n).collect();
    let selection = select_models(&loglik, &k, &n, config.corrected)?;

    info!(
        mode = ?mode,
        fitted = models.len(),
        skipped = skipped.len(),
        best = %models[selection.best].label(),
        aw = selection.weights[selection.best],
        "model selection done"
    );

    Ok(FitSelection {
        mode,
        models,
        selection,
        skipped,
    })
}
