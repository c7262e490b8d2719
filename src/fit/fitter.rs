//! Reference fitter for a single template combination.
//!
//! Given:
//! - an observation (photometry, optional spectrum)
//! - one galaxy dust template (plus the shared PAH template)
//! - an optional AGN component (analytic or template pair)
//!
//! we search the nonlinear parameters on a grid (`tau9p7`, and for the
//! analytic AGN the power-law break and slopes). At each grid point the model
//! flux is linear in the component normalizations, so those are solved by
//! weighted least squares on the detections. Grid points whose
//! normalizations are not all strictly positive are rejected, the rest are
//! scored with the combined log-likelihood, and the best one wins.

use rayon::prelude::*;
use tracing::debug;

use crate::data::{FilterBank, Template, TemplateStore};
use crate::domain::{
    AgnComponent, AnalyticAgn, CandidateModel, FitConfig, Observation, TemplateAgn,
};
use crate::error::SedError;
use crate::fit::grid::{powerlaw_grid, tau_grid, PowerLawShape};
use crate::fit::likelihood::combined_loglikelihood;
use crate::math::solve_weighted;
use crate::models::{agn_powerlaw_curve, silicate_emission_profiles, Observer};
use crate::physics::{silicate_attenuation, Cosmology};

/// Which AGN component, if any, accompanies the galaxy template.
#[derive(Debug, Clone, Copy)]
pub enum AgnChoice<'a> {
    Off,
    Analytic,
    Template {
        continuum: &'a Template,
        silicate: &'a Template,
    },
}

/// Everything shared by the fits of one observation.
#[derive(Debug)]
pub struct FitContext<'a> {
    store: &'a TemplateStore,
    obs: &'a Observation,
    observer: Observer<'a>,
    spectrum_weight: f64,
    taus: Vec<f64>,
    shapes: Vec<PowerLawShape>,
    /// Free shape parameters of the analytic power law (grid axes with >1 value).
    free_shape_params: usize,
    /// Indices of detected data points, with their fluxes and LSQ weights.
    rows: Vec<usize>,
    y: Vec<f64>,
    w: Vec<f64>,
}

impl<'a> FitContext<'a> {
    pub fn new(
        cosmo: &Cosmology,
        store: &'a TemplateStore,
        bank: &'a FilterBank,
        obs: &'a Observation,
        config: &FitConfig,
    ) -> Result<Self, SedError> {
        if !(config.spectrum_weight.is_finite() && config.spectrum_weight > 0.0) {
            return Err(SedError::invalid("spectrum weight must be finite and > 0"));
        }
        let observer = Observer::new(cosmo, bank, store.wavelength(), obs)?;
        let taus = tau_grid(config)?;
        let shapes = powerlaw_grid(config)?;
        let free_shape_params =
            usize::from(config.l_break_steps > 1) + 2 * usize::from(config.alpha_steps > 1);

        let mut rows = Vec::new();
        let mut y = Vec::new();
        let mut w = Vec::new();
        let phot = &obs.photometry;
        for i in 0..phot.len() {
            if !phot.upper_limit[i] {
                rows.push(i);
                y.push(phot.flux[i]);
                w.push(1.0 / (phot.flux_err[i] * phot.flux_err[i]));
            }
        }
        if let Some(spec) = &obs.spectrum {
            for j in 0..spec.len() {
                rows.push(phot.len() + j);
                y.push(spec.flux[j]);
                w.push(config.spectrum_weight / (spec.flux_err[j] * spec.flux_err[j]));
            }
        }

        Ok(Self {
            store,
            obs,
            observer,
            spectrum_weight: config.spectrum_weight,
            taus,
            shapes,
            free_shape_params,
            rows,
            y,
            w,
        })
    }

    pub fn n_detections(&self) -> usize {
        self.rows.len()
    }

    /// Free-parameter count of a combination.
    pub fn param_count(&self, agn: AgnChoice<'_>) -> usize {
        let host = 2 + usize::from(self.taus.len() > 1);
        host + match agn {
            AgnChoice::Off => 0,
            AgnChoice::Template { .. } => 2,
            AgnChoice::Analytic => 3 + self.free_shape_params,
        }
    }
}

#[derive(Debug, Clone)]
struct GridFit {
    idx: usize,
    tau: f64,
    shape: Option<PowerLawShape>,
    coefs: Vec<f64>,
    loglik: f64,
}

/// Fit one galaxy template with an optional AGN component.
///
/// Returns `InsufficientData` when there are fewer detections than
/// normalizations, and `Numerical` when no grid point yields strictly
/// positive normalizations with a finite likelihood.
pub fn fit_candidate(
    ctx: &FitContext<'_>,
    galaxy: &Template,
    agn: AgnChoice<'_>,
) -> Result<CandidateModel, SedError> {
    let pah = ctx.store.pah()?;
    let wav = ctx.store.wavelength();

    let n_linear = 2 + match agn {
        AgnChoice::Off => 0,
        AgnChoice::Template { .. } => 2,
        AgnChoice::Analytic => 3,
    };
    if ctx.n_detections() < n_linear {
        return Err(SedError::InsufficientData(format!(
            "{} detections for {n_linear} normalizations",
            ctx.n_detections()
        )));
    }

    // Unit-normalized component projections. Host columns depend on tau only.
    let host_columns = ctx
        .taus
        .par_iter()
        .map(|&tau| -> Result<Vec<Vec<f64>>, SedError> {
            let t = silicate_attenuation(wav, tau);
            let dust: Vec<f64> = galaxy.nu_lnu.iter().zip(&t).map(|(v, t)| v * t).collect();
            let pah: Vec<f64> = pah.nu_lnu.iter().zip(&t).map(|(v, t)| v * t).collect();
            Ok(vec![ctx.observer.observe(&dust)?, ctx.observer.observe(&pah)?])
        })
        .collect::<Result<Vec<_>, SedError>>()?;

    let fixed_agn_columns = match agn {
        AgnChoice::Off => Vec::new(),
        AgnChoice::Template { continuum, silicate } => vec![
            ctx.observer.observe(&continuum.nu_lnu)?,
            ctx.observer.observe(&silicate.nu_lnu)?,
        ],
        AgnChoice::Analytic => {
            let (si11, si18) = silicate_emission_profiles(wav);
            vec![ctx.observer.observe(&si11)?, ctx.observer.observe(&si18)?]
        }
    };

    let shapes: &[PowerLawShape] = match agn {
        AgnChoice::Analytic => &ctx.shapes,
        _ => &[],
    };
    let pl_columns = shapes
        .par_iter()
        .map(|s| ctx.observer.observe(&agn_powerlaw_curve(wav, s.l_break, s.alpha1, s.alpha2)))
        .collect::<Result<Vec<_>, SedError>>()?;

    let n_shapes = shapes.len().max(1);
    let n_grid = ctx.taus.len() * n_shapes;

    let candidates: Vec<GridFit> = (0..n_grid)
        .into_par_iter()
        .filter_map(|idx| {
            let (ti, si) = (idx / n_shapes, idx % n_shapes);
            let mut columns: Vec<&[f64]> = host_columns[ti].iter().map(Vec::as_slice).collect();
            columns.extend(fixed_agn_columns.iter().map(Vec::as_slice));
            if let Some(pl) = pl_columns.get(si) {
                columns.push(pl);
            }
            evaluate_grid_point(ctx, &columns).map(|(coefs, loglik)| GridFit {
                idx,
                tau: ctx.taus[ti],
                shape: shapes.get(si).copied(),
                coefs,
                loglik,
            })
        })
        .collect();

    // Deterministic selection: maximum log-likelihood; ties go to the lowest grid index.
    let Some(mut best) = candidates.first() else {
        return Err(SedError::numerical(format!(
            "no grid point of {} gave positive normalizations",
            galaxy.name
        )));
    };
    for c in &candidates[1..] {
        if c.loglik > best.loglik || (c.loglik == best.loglik && c.idx < best.idx) {
            best = c;
        }
    }
    debug!(
        galaxy = %galaxy.name,
        grid = n_grid,
        accepted = candidates.len(),
        loglik = best.loglik,
        "fitted candidate"
    );

    let log = |v: f64| v.log10();
    let agn_component = match agn {
        AgnChoice::Off => None,
        AgnChoice::Template { continuum, silicate } => Some(AgnComponent::Template(TemplateAgn {
            continuum: continuum.name.clone(),
            silicate: silicate.name.clone(),
            log_norm_continuum: log(best.coefs[2]),
            log_norm_silicate: log(best.coefs[3]),
        })),
        AgnChoice::Analytic => {
            let shape = best
                .shape
                .ok_or_else(|| SedError::numerical("analytic AGN fit lost its power-law shape"))?;
            Some(AgnComponent::Analytic(AnalyticAgn {
                log_norm_si11: log(best.coefs[2]),
                log_norm_si18: log(best.coefs[3]),
                log_norm_pl: log(best.coefs[4]),
                l_break: shape.l_break,
                alpha1: shape.alpha1,
                alpha2: shape.alpha2,
            }))
        }
    };

    Ok(CandidateModel {
        galaxy_template: galaxy.name.clone(),
        log_norm_dust: log(best.coefs[0]),
        log_norm_pah: log(best.coefs[1]),
        tau9p7: best.tau,
        agn: agn_component,
        loglikelihood: best.loglik,
        k: ctx.param_count(agn),
        n: ctx.obs.n_points(),
    })
}

/// Solve the normalizations at one grid point and score the result.
fn evaluate_grid_point(ctx: &FitContext<'_>, columns: &[&[f64]]) -> Option<(Vec<f64>, f64)> {
    let design: Vec<Vec<f64>> = columns
        .iter()
        .map(|col| ctx.rows.iter().map(|&r| col[r]).collect())
        .collect();
    let coefs = solve_weighted(&design, &ctx.y, &ctx.w)?;
    if coefs.iter().any(|c| !(c.is_finite() && *c > 0.0)) {
        return None;
    }

    let n = columns.first().map_or(0, |c| c.len());
    let predicted: Vec<f64> = (0..n)
        .map(|i| columns.iter().zip(&coefs).map(|(col, c)| c * col[i]).sum())
        .collect();
    let loglik = combined_loglikelihood(ctx.obs, &predicted, ctx.spectrum_weight);
    loglik.is_finite().then_some((coefs, loglik))
}
