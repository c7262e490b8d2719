//! Observation CSV ingest.
//!
//! Turns the photometry table (and optional spectrum table) into an
//! `Observation`. Parsing only: physical checks live in the pre-flight
//! validator, so NaN or negative values pass through here and are reported
//! there with the array they belong to.
//!
//! Schema:
//! - photometry: `wavelength,flux,eflux,filter[,upper_limit]`
//! - spectrum: `wavelength,flux,eflux`
//!
//! Header names are case-insensitive and a UTF-8 BOM is ignored.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::domain::{Observation, Photometry, Spectrum};
use crate::error::SedError;

/// Read the photometry table.
pub fn load_photometry(path: &Path) -> Result<Photometry, SedError> {
    let (header_map, records) = read_table(path)?;
    for name in ["wavelength", "flux", "eflux", "filter"] {
        ensure_column(path, &header_map, name)?;
    }

    let mut phot = Photometry::default();
    for (line, record) in records {
        let at = |e: String| SedError::invalid(format!("'{}' line {line}: {e}", path.display()));
        let number = |name: &str| required_f64(&record, &header_map, name).map_err(at);
        phot.wavelength.push(number("wavelength")?);
        phot.flux.push(number("flux")?);
        phot.flux_err.push(number("eflux")?);
        phot.filter.push(get_required(&record, &header_map, "filter").map_err(at)?.to_string());
        let upper = match get_optional(&record, &header_map, "upper_limit") {
            Some(s) => parse_flag(s).map_err(at)?,
            None => false,
        };
        phot.upper_limit.push(upper);
    }

    debug!(path = %path.display(), points = phot.len(), "read photometry");
    Ok(phot)
}

/// Read the spectrum table.
pub fn load_spectrum(path: &Path) -> Result<Spectrum, SedError> {
    let (header_map, records) = read_table(path)?;
    for name in ["wavelength", "flux", "eflux"] {
        ensure_column(path, &header_map, name)?;
    }

    let mut spec = Spectrum::default();
    for (line, record) in records {
        let at = |e: String| SedError::invalid(format!("'{}' line {line}: {e}", path.display()));
        let number = |name: &str| required_f64(&record, &header_map, name).map_err(at);
        spec.wavelength.push(number("wavelength")?);
        spec.flux.push(number("flux")?);
        spec.flux_err.push(number("eflux")?);
    }

    debug!(path = %path.display(), points = spec.len(), "read spectrum");
    Ok(spec)
}

/// Assemble an observation from its tables.
pub fn load_observation(
    photometry: &Path,
    spectrum: Option<&Path>,
    redshift: f64,
) -> Result<Observation, SedError> {
    Ok(Observation {
        redshift,
        spectrum: spectrum.map(load_spectrum).transpose()?,
        photometry: load_photometry(photometry)?,
    })
}

type Records = Vec<(usize, StringRecord)>;

fn read_table(path: &Path) -> Result<(HashMap<String, usize>, Records), SedError> {
    let file = File::open(path).map_err(|e| SedError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let header_map = build_header_map(reader.headers()?);
    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, after the header.
        records.push((idx + 2, result?));
    }
    Ok((header_map, records))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_column(
    path: &Path,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<(), SedError> {
    if header_map.contains_key(name) {
        Ok(())
    } else {
        Err(SedError::invalid(format!(
            "'{}': missing required column `{name}`",
            path.display()
        )))
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value `{name}`"))
}

fn required_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<f64, String> {
    parse_f64(get_required(record, header_map, name)?)
}

fn get_optional<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str) -> Result<f64, String> {
    s.parse::<f64>().map_err(|_| format!("`{s}` is not a number"))
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(format!("`{s}` is not a valid upper_limit flag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_photometry_with_bom_and_mixed_case_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "phot.csv",
            "\u{feff}Wavelength,FLUX,eFlux,Filter,Upper_Limit\n\
             24,0.5,0.05,MIPS24,0\n70,1.5,0.1,PACS70,true\n160,2.0,,PACS160,\n",
        );
        let err = load_photometry(&path).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{err}");

        let path = write(
            &dir,
            "phot.csv",
            "\u{feff}Wavelength,FLUX,eFlux,Filter,Upper_Limit\n\
             24,0.5,0.05,MIPS24,0\n70,1.5,0.1,PACS70,true\n160,2.0,0.2,PACS160,\n",
        );
        let phot = load_photometry(&path).unwrap();
        assert_eq!(phot.wavelength, vec![24.0, 70.0, 160.0]);
        assert_eq!(phot.filter[2], "PACS160");
        assert_eq!(phot.upper_limit, vec![false, true, false]);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "phot.csv", "wavelength,flux,filter\n24,1,MIPS24\n");
        let err = load_photometry(&path).unwrap_err();
        assert!(err.to_string().contains("`eflux`"), "{err}");
    }

    #[test]
    fn nan_passes_through_to_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "spec.csv", "wavelength,flux,eflux\n5,NaN,0.1\n6,0.2,0.1\n");
        let spec = load_spectrum(&path).unwrap();
        assert!(spec.flux[0].is_nan());
    }

    #[test]
    fn assembles_observation() {
        let dir = tempfile::tempdir().unwrap();
        let phot = write(&dir, "phot.csv", "wavelength,flux,eflux,filter\n24,1,0.1,MIPS24\n");
        let spec = write(&dir, "spec.csv", "wavelength,flux,eflux\n5,0.1,0.01\n");
        let obs = load_observation(&phot, Some(&spec), 0.3).unwrap();
        assert_eq!(obs.redshift, 0.3);
        assert_eq!(obs.n_points(), 2);
    }
}
