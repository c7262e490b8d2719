//! Fitting output table: one row per candidate model.
//!
//! The column set depends on how the AGN was reconstructed:
//! - analytic runs name the galaxy template in `tplName` and carry the power
//!   law / silicate feature parameters
//! - template runs name `tplName_gal`, `tplName_AGN` and `tplName_Siem` and
//!   carry `logNormAGN` / `logNormSiem`
//!
//! AGN columns are left empty for galaxy-only rows. The table is the contract
//! between `fit` and `derive`, so reading it back yields the same candidate
//! models and selection.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AgnComponent, AgnReconstructionMode, AnalyticAgn, CandidateModel, ModelSelection, TemplateAgn,
};
use crate::error::SedError;

#[derive(Debug, Serialize)]
struct AnalyticRow<'a> {
    #[serde(rename = "tplName")]
    tpl_name: &'a str,
    #[serde(rename = "logNormGal_dust")]
    log_norm_gal_dust: f64,
    #[serde(rename = "logNormGal_PAH")]
    log_norm_gal_pah: f64,
    #[serde(rename = "AGNon")]
    agn_on: u8,
    tau9p7: f64,
    #[serde(rename = "logNorm_Si11")]
    log_norm_si11: Option<f64>,
    #[serde(rename = "logNorm_Si18")]
    log_norm_si18: Option<f64>,
    #[serde(rename = "logNormAGN_PL")]
    log_norm_agn_pl: Option<f64>,
    #[serde(rename = "lBreak_PL")]
    l_break_pl: Option<f64>,
    #[serde(rename = "alpha1_PL")]
    alpha1_pl: Option<f64>,
    #[serde(rename = "alpha2_PL")]
    alpha2_pl: Option<f64>,
    logl: f64,
    k: usize,
    n: usize,
    #[serde(rename = "AICc")]
    aicc: f64,
    #[serde(rename = "Aw")]
    aw: f64,
    #[serde(rename = "bestModelFlag")]
    best_model_flag: u8,
}

#[derive(Debug, Serialize)]
struct TemplateRow<'a> {
    #[serde(rename = "tplName_gal")]
    tpl_name_gal: &'a str,
    #[serde(rename = "tplName_AGN")]
    tpl_name_agn: Option<&'a str>,
    #[serde(rename = "tplName_Siem")]
    tpl_name_siem: Option<&'a str>,
    #[serde(rename = "logNormGal_dust")]
    log_norm_gal_dust: f64,
    #[serde(rename = "logNormGal_PAH")]
    log_norm_gal_pah: f64,
    #[serde(rename = "AGNon")]
    agn_on: u8,
    tau9p7: f64,
    #[serde(rename = "logNormAGN")]
    log_norm_agn: Option<f64>,
    #[serde(rename = "logNormSiem")]
    log_norm_siem: Option<f64>,
    logl: f64,
    k: usize,
    n: usize,
    #[serde(rename = "AICc")]
    aicc: f64,
    #[serde(rename = "Aw")]
    aw: f64,
    #[serde(rename = "bestModelFlag")]
    best_model_flag: u8,
}

/// Any row of the table, whichever mode wrote it.
#[derive(Debug, Clone, Deserialize)]
struct ResultRow {
    #[serde(rename = "tplName", default)]
    tpl_name: Option<String>,
    #[serde(rename = "tplName_gal", default)]
    tpl_name_gal: Option<String>,
    #[serde(rename = "tplName_AGN", default)]
    tpl_name_agn: Option<String>,
    #[serde(rename = "tplName_Siem", default)]
    tpl_name_siem: Option<String>,
    #[serde(rename = "logNormGal_dust")]
    log_norm_gal_dust: f64,
    #[serde(rename = "logNormGal_PAH")]
    log_norm_gal_pah: f64,
    #[serde(rename = "AGNon")]
    agn_on: u8,
    tau9p7: f64,
    #[serde(rename = "logNorm_Si11", default)]
    log_norm_si11: Option<f64>,
    #[serde(rename = "logNorm_Si18", default)]
    log_norm_si18: Option<f64>,
    #[serde(rename = "logNormAGN_PL", default)]
    log_norm_agn_pl: Option<f64>,
    #[serde(rename = "lBreak_PL", default)]
    l_break_pl: Option<f64>,
    #[serde(rename = "alpha1_PL", default)]
    alpha1_pl: Option<f64>,
    #[serde(rename = "alpha2_PL", default)]
    alpha2_pl: Option<f64>,
    #[serde(rename = "logNormAGN", default)]
    log_norm_agn: Option<f64>,
    #[serde(rename = "logNormSiem", default)]
    log_norm_siem: Option<f64>,
    logl: f64,
    k: usize,
    n: usize,
    #[serde(rename = "AICc")]
    aicc: f64,
    #[serde(rename = "Aw")]
    aw: f64,
    #[serde(rename = "bestModelFlag")]
    best_model_flag: u8,
}

/// Candidate models and their selection, as stored in the table.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    pub models: Vec<CandidateModel>,
    pub selection: ModelSelection,
}

/// Write the fitting output table.
pub fn write_results_csv(
    path: &Path,
    mode: AgnReconstructionMode,
    models: &[CandidateModel],
    selection: &ModelSelection,
) -> Result<(), SedError> {
    if models.len() != selection.weights.len() || models.len() != selection.aic.len() {
        return Err(SedError::invalid("models and selection differ in length"));
    }
    let file = File::create(path).map_err(|e| SedError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    for (i, m) in models.iter().enumerate() {
        let aicc = selection.aic[i];
        let aw = selection.weights[i];
        let best_model_flag = u8::from(selection.is_best(i));
        let agn_on = u8::from(m.agn_on());
        match mode {
            AgnReconstructionMode::Analytic => {
                let p = match &m.agn {
                    Some(AgnComponent::Analytic(p)) => Some(p),
                    None => None,
                    Some(AgnComponent::Template(_)) => {
                        return Err(SedError::invalid(format!(
                            "model {} has a template AGN in an analytic results table",
                            m.label()
                        )));
                    }
                };
                writer.serialize(AnalyticRow {
                    tpl_name: &m.galaxy_template,
                    log_norm_gal_dust: m.log_norm_dust,
                    log_norm_gal_pah: m.log_norm_pah,
                    agn_on,
                    tau9p7: m.tau9p7,
                    log_norm_si11: p.map(|p| p.log_norm_si11),
                    log_norm_si18: p.map(|p| p.log_norm_si18),
                    log_norm_agn_pl: p.map(|p| p.log_norm_pl),
                    l_break_pl: p.map(|p| p.l_break),
                    alpha1_pl: p.map(|p| p.alpha1),
                    alpha2_pl: p.map(|p| p.alpha2),
                    logl: m.loglikelihood,
                    k: m.k,
                    n: m.n,
                    aicc,
                    aw,
                    best_model_flag,
                })?;
            }
            AgnReconstructionMode::Template => {
                let t = match &m.agn {
                    Some(AgnComponent::Template(t)) => Some(t),
                    None => None,
                    Some(AgnComponent::Analytic(_)) => {
                        return Err(SedError::invalid(format!(
                            "model {} has an analytic AGN in a template results table",
                            m.label()
                        )));
                    }
                };
                writer.serialize(TemplateRow {
                    tpl_name_gal: &m.galaxy_template,
                    tpl_name_agn: t.map(|t| t.continuum.as_str()),
                    tpl_name_siem: t.map(|t| t.silicate.as_str()),
                    log_norm_gal_dust: m.log_norm_dust,
                    log_norm_gal_pah: m.log_norm_pah,
                    agn_on,
                    tau9p7: m.tau9p7,
                    log_norm_agn: t.map(|t| t.log_norm_continuum),
                    log_norm_siem: t.map(|t| t.log_norm_silicate),
                    logl: m.loglikelihood,
                    k: m.k,
                    n: m.n,
                    aicc,
                    aw,
                    best_model_flag,
                })?;
            }
        }
    }
    writer.flush().map_err(|e| SedError::io(path, e))?;
    Ok(())
}

/// Read a fitting output table written by either mode.
pub fn read_results_csv(path: &Path) -> Result<ResultsTable, SedError> {
    let file = File::open(path).map_err(|e| SedError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut models = Vec::new();
    let mut aic = Vec::new();
    let mut weights = Vec::new();
    let mut best = None;
    let mut corrected = false;
    for (idx, row) in reader.deserialize::<ResultRow>().enumerate() {
        let row = row?;
        let line = idx + 2;
        let plain = 2.0 * row.k as f64 - 2.0 * row.logl;
        corrected |= (row.aicc - plain).abs() > 1e-9 * row.aicc.abs().max(1.0);
        if row.best_model_flag == 1 && best.is_none() {
            best = Some(idx);
        }
        aic.push(row.aicc);
        weights.push(row.aw);
        models.push(to_candidate(row).map_err(|e| {
            SedError::invalid(format!("'{}' line {line}: {e}", path.display()))
        })?);
    }

    if models.is_empty() {
        return Err(SedError::InsufficientData(format!(
            "'{}' holds no models",
            path.display()
        )));
    }
    let best = best.ok_or_else(|| {
        SedError::invalid(format!("'{}': no row has bestModelFlag = 1", path.display()))
    })?;

    Ok(ResultsTable {
        models,
        selection: ModelSelection {
            aic,
            weights,
            best,
            corrected,
        },
    })
}

fn to_candidate(row: ResultRow) -> Result<CandidateModel, String> {
    let galaxy_template = row
        .tpl_name
        .or(row.tpl_name_gal)
        .ok_or("missing `tplName` / `tplName_gal`")?;

    let need = |v: Option<f64>, name: &str| v.ok_or_else(|| format!("AGN row without `{name}`"));
    let agn = match row.agn_on {
        0 => None,
        1 => Some(match row.tpl_name_agn {
            Some(continuum) => AgnComponent::Template(TemplateAgn {
                continuum,
                silicate: row.tpl_name_siem.ok_or("AGN row without `tplName_Siem`")?,
                log_norm_continuum: need(row.log_norm_agn, "logNormAGN")?,
                log_norm_silicate: need(row.log_norm_siem, "logNormSiem")?,
            }),
            None => AgnComponent::Analytic(AnalyticAgn {
                log_norm_si11: need(row.log_norm_si11, "logNorm_Si11")?,
                log_norm_si18: need(row.log_norm_si18, "logNorm_Si18")?,
                log_norm_pl: need(row.log_norm_agn_pl, "logNormAGN_PL")?,
                l_break: need(row.l_break_pl, "lBreak_PL")?,
                alpha1: need(row.alpha1_pl, "alpha1_PL")?,
                alpha2: need(row.alpha2_pl, "alpha2_PL")?,
            }),
        }),
        other => return Err(format!("`AGNon` must be 0 or 1, got {other}")),
    };

    Ok(CandidateModel {
        galaxy_template,
        log_norm_dust: row.log_norm_gal_dust,
        log_norm_pah: row.log_norm_gal_pah,
        tau9p7: row.tau9p7,
        agn,
        loglikelihood: row.logl,
        k: row.k,
        n: row.n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::select_models;

    fn host(name: &str, ll: f64) -> CandidateModel {
        CandidateModel {
            galaxy_template: name.into(),
            log_norm_dust: 9.5,
            log_norm_pah: 8.7,
            tau9p7: 0.5,
            agn: None,
            loglikelihood: ll,
            k: 3,
            n: 12,
        }
    }

    fn scored(models: &[CandidateModel]) -> ModelSelection {
        let ll: Vec<f64> = models.iter().map(|m| m.loglikelihood).collect();
        let k: Vec<usize> = models.iter().map(|m| m.k).collect();
        let n: Vec<usize> = models.iter().map(|m| m.n).collect();
        select_models(&ll, &k, &n, true).unwrap()
    }

    #[test]
    fn template_table_reads_back() {
        let mut with_agn = host("gal_2", -3.0);
        with_agn.k = 5;
        with_agn.agn = Some(AgnComponent::Template(TemplateAgn {
            continuum: "AGN_1".into(),
            silicate: "AGN_1Siem".into(),
            log_norm_continuum: 9.1,
            log_norm_silicate: 8.0,
        }));
        let models = vec![host("gal_1", -4.0), with_agn];
        let selection = scored(&models);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");
        write_results_csv(&path, AgnReconstructionMode::Template, &models, &selection).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        let header = header.lines().next().unwrap();
        assert!(header.starts_with("tplName_gal,tplName_AGN,tplName_Siem,"));
        assert!(header.ends_with("logl,k,n,AICc,Aw,bestModelFlag"));

        let table = read_results_csv(&path).unwrap();
        assert_eq!(table.models, models);
        assert_eq!(table.selection.best, selection.best);
        assert!(table.selection.corrected);
        for (a, b) in table.selection.weights.iter().zip(&selection.weights) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn analytic_table_reads_back() {
        let mut with_agn = host("gal_1", -2.0);
        with_agn.k = 9;
        with_agn.agn = Some(AgnComponent::Analytic(AnalyticAgn {
            log_norm_si11: 8.1,
            log_norm_si18: 7.9,
            log_norm_pl: 9.3,
            l_break: 15.0,
            alpha1: 0.5,
            alpha2: 1.0,
        }));
        let models = vec![host("gal_1", -5.0), with_agn];
        let selection = scored(&models);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");
        write_results_csv(&path, AgnReconstructionMode::Analytic, &models, &selection).unwrap();
        let table = read_results_csv(&path).unwrap();
        assert_eq!(table.models, models);
    }

    #[test]
    fn table_without_best_flag_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.csv");
        std::fs::write(
            &path,
            "tplName,logNormGal_dust,logNormGal_PAH,AGNon,tau9p7,logl,k,n,AICc,Aw,bestModelFlag\n\
             gal_1,9,8,0,0,-1,2,10,7.7,1,0\n",
        )
        .unwrap();
        let err = read_results_csv(&path).unwrap_err();
        assert!(err.to_string().contains("bestModelFlag"));
    }
}
