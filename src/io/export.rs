//! Export derived quantities.
//!
//! - CSV: one row per candidate model, meant for spreadsheets
//! - JSON: the same rows plus the ensemble summary

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DerivedQuantities, DerivedSummary};
use crate::error::SedError;

/// JSON document written by `write_derived_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFile {
    pub tool: String,
    pub models: Vec<DerivedQuantities>,
    pub summary: DerivedSummary,
}

/// Write per-model derived quantities to a CSV file.
pub fn write_derived_csv(path: &Path, rows: &[DerivedQuantities]) -> Result<(), SedError> {
    let file = File::create(path).map_err(|e| SedError::io(path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| SedError::io(path, e))?;
    Ok(())
}

/// Write derived quantities and the summary to a JSON file.
pub fn write_derived_json(
    path: &Path,
    rows: &[DerivedQuantities],
    summary: &DerivedSummary,
) -> Result<(), SedError> {
    let file = File::create(path).map_err(|e| SedError::io(path, e))?;
    let doc = DerivedFile {
        tool: "sedsep".to_string(),
        models: rows.to_vec(),
        summary: summary.clone(),
    };
    serde_json::to_writer_pretty(file, &doc)?;
    Ok(())
}

/// Read a JSON file written by `write_derived_json`.
pub fn read_derived_json(path: &Path) -> Result<DerivedFile, SedError> {
    let file = File::open(path).map_err(|e| SedError::io(path, e))?;
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, aw: f64) -> DerivedQuantities {
        DerivedQuantities {
            label: label.into(),
            agn_on: false,
            aw,
            best_model: aw > 0.5,
            loglum_host_ir: 11.2,
            e_loglum_host_ir: 0.02,
            loglum_host_mir: 10.1,
            e_loglum_host_mir: 0.03,
            loglum_host_fir: 11.0,
            e_loglum_host_fir: 0.02,
            loglum_agn_ir: 0.0,
            loglum_agn_mir: 0.0,
            loglum_agn_fir: 0.0,
            agn_frac_ir: 0.0,
            agn_frac_mir: 0.0,
            agn_frac_fir: 0.0,
            sfr: 17.3,
            e_sfr: 0.8,
            w_sfr: 17.3 * aw,
            e_w_sfr: 0.8 * aw,
        }
    }

    #[test]
    fn csv_has_one_row_per_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("derived.csv");
        write_derived_csv(&path, &[row("gal_1", 0.7), row("gal_2", 0.3)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("label,agn_on,aw,best_model,loglum_host_ir"));
        assert!(lines[1].starts_with("gal_1,true") || lines[1].starts_with("gal_1,false"));
    }

    #[test]
    fn json_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("derived.json");
        let rows = vec![row("gal_1", 1.0)];
        let summary = DerivedSummary {
            best_label: "gal_1".into(),
            sfr_averaged: 17.3,
            e_sfr_averaged: 0.8,
        };
        write_derived_json(&path, &rows, &summary).unwrap();
        let doc = read_derived_json(&path).unwrap();
        assert_eq!(doc.models, rows);
        assert_eq!(doc.summary, summary);
    }
}
