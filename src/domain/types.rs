//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for derivation or comparisons

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Physical role of a template column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Host dust continuum.
    GalaxyDust,
    /// Host PAH emission.
    GalaxyPah,
    /// AGN continuum.
    AgnContinuum,
    /// AGN silicate emission, paired with one continuum.
    AgnSilicate,
}

/// How the AGN component of a candidate is rebuilt.
///
/// - `Analytic`: two log-Gaussian silicate features plus a double-broken power
///   law (spectrum + photometry fits).
/// - `Template`: a tabulated AGN continuum plus its silicate-emission template,
///   each with its own normalization (photometry-only fits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgnReconstructionMode {
    Analytic,
    Template,
}

/// Which AGN reconstruction to use for a run.
///
/// `Auto` means: analytic when a spectrum is supplied, template otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeSpec {
    Auto,
    Analytic,
    Template,
}

impl ModeSpec {
    pub fn resolve(self, has_spectrum: bool) -> AgnReconstructionMode {
        match self {
            ModeSpec::Analytic => AgnReconstructionMode::Analytic,
            ModeSpec::Template => AgnReconstructionMode::Template,
            ModeSpec::Auto if has_spectrum => AgnReconstructionMode::Analytic,
            ModeSpec::Auto => AgnReconstructionMode::Template,
        }
    }
}

/// Luminosity bands used for the decomposition (rest-frame microns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    Ir,
    Mir,
    Fir,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Ir, Band::Mir, Band::Fir];

    /// Rest-frame wavelength window in microns.
    pub fn bounds_um(self) -> (f64, f64) {
        match self {
            Band::Ir => (8.0, 1000.0),
            Band::Mir => (5.0, 35.0),
            Band::Fir => (40.0, 1000.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Ir => "IR",
            Band::Mir => "MIR",
            Band::Fir => "FIR",
        }
    }
}

/// An observed spectrum (observed-frame microns, Jy).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

/// Broad-band photometry (observed-frame microns, Jy).
///
/// For points flagged as upper limits, `flux` holds the limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Photometry {
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub filter: Vec<String>,
    pub upper_limit: Vec<bool>,
}

impl Photometry {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    pub fn n_upper_limits(&self) -> usize {
        self.upper_limit.iter().filter(|&&u| u).count()
    }
}

/// One fitting target.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub redshift: f64,
    pub spectrum: Option<Spectrum>,
    pub photometry: Photometry,
}

impl Observation {
    /// Total number of data points entering the likelihood.
    pub fn n_points(&self) -> usize {
        self.photometry.len() + self.spectrum.as_ref().map_or(0, Spectrum::len)
    }
}

/// AGN shape for the analytic reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticAgn {
    pub log_norm_si11: f64,
    pub log_norm_si18: f64,
    /// Power-law nuLnu at the 15 um anchor (log10 Lsun).
    pub log_norm_pl: f64,
    pub l_break: f64,
    pub alpha1: f64,
    pub alpha2: f64,
}

/// AGN built from a continuum template and its silicate-emission template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAgn {
    pub continuum: String,
    pub silicate: String,
    pub log_norm_continuum: f64,
    pub log_norm_silicate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AgnComponent {
    Analytic(AnalyticAgn),
    Template(TemplateAgn),
}

/// One fitted hypothesis: a galaxy template plus an optional AGN component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateModel {
    pub galaxy_template: String,
    pub log_norm_dust: f64,
    pub log_norm_pah: f64,
    /// Silicate optical depth at 9.7 um applied to the host component.
    pub tau9p7: f64,
    pub agn: Option<AgnComponent>,
    pub loglikelihood: f64,
    /// Free-parameter count.
    pub k: usize,
    /// Number of data points used in the fit.
    pub n: usize,
}

impl CandidateModel {
    pub fn agn_on(&self) -> bool {
        self.agn.is_some()
    }

    /// Short label for reports, e.g. `gal_1+AGN_2` or `gal_1+PL`.
    pub fn label(&self) -> String {
        match &self.agn {
            None => self.galaxy_template.clone(),
            Some(AgnComponent::Analytic(_)) => format!("{}+PL", self.galaxy_template),
            Some(AgnComponent::Template(t)) => format!("{}+{}", self.galaxy_template, t.continuum),
        }
    }
}

/// Output of the Model-Selection Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    /// AIC (or AICc when `corrected`) per model.
    pub aic: Vec<f64>,
    /// Akaike weights, summing to 1.
    pub weights: Vec<f64>,
    /// Index of the minimum-AIC model (first occurrence on ties).
    pub best: usize,
    /// Whether the small-sample correction was applied.
    pub corrected: bool,
}

impl ModelSelection {
    pub fn is_best(&self, idx: usize) -> bool {
        idx == self.best
    }
}

/// Per-model derived physical quantities (log10 Lsun, Msun/yr).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    pub label: String,
    pub agn_on: bool,
    pub aw: f64,
    pub best_model: bool,

    pub loglum_host_ir: f64,
    pub e_loglum_host_ir: f64,
    pub loglum_host_mir: f64,
    pub e_loglum_host_mir: f64,
    pub loglum_host_fir: f64,
    pub e_loglum_host_fir: f64,

    /// 0 when the AGN is off.
    pub loglum_agn_ir: f64,
    pub loglum_agn_mir: f64,
    pub loglum_agn_fir: f64,

    pub agn_frac_ir: f64,
    pub agn_frac_mir: f64,
    pub agn_frac_fir: f64,

    pub sfr: f64,
    pub e_sfr: f64,
    pub w_sfr: f64,
    pub e_w_sfr: f64,
}

/// Ensemble summary over all candidate models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSummary {
    pub best_label: String,
    /// `Σ wSFR` over the candidate set.
    pub sfr_averaged: f64,
    /// Quadrature sum of `ewSFR`.
    pub e_sfr_averaged: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub mode: ModeSpec,
    /// Apply the small-sample AICc correction.
    pub corrected: bool,
    /// Also fit AGN-bearing models (galaxy-only models are always fitted).
    pub with_agn: bool,

    pub tau_min: f64,
    pub tau_max: f64,
    pub tau_steps: usize,

    pub l_break_min: f64,
    pub l_break_max: f64,
    pub l_break_steps: usize,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub alpha_steps: usize,

    /// Likelihood weight of each spectral point relative to photometry.
    pub spectrum_weight: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            mode: ModeSpec::Auto,
            corrected: true,
            with_agn: true,
            tau_min: 0.0,
            tau_max: 3.0,
            tau_steps: 7,
            l_break_min: 10.0,
            l_break_max: 30.0,
            l_break_steps: 5,
            alpha_min: -0.5,
            alpha_max: 1.5,
            alpha_steps: 5,
            spectrum_weight: 1.0,
        }
    }
}
