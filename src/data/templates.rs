//! Template store: the fixed table of emission templates.
//!
//! The resource is a CSV with a `lambda_mic` column and, per template, a
//! `nuLnu` column `<name>` plus its uncertainty column `e<name>`. Which role a
//! column plays comes from a [`TemplateSchema`], normally a JSON sidecar:
//!
//! ```json
//! [
//!   {"column": "gal_1", "kind": "galaxy_dust"},
//!   {"column": "gal_PAH", "kind": "galaxy_pah"},
//!   {"column": "AGN_1", "kind": "agn_continuum"},
//!   {"column": "AGN_1Siem", "kind": "agn_silicate", "pairs_with": "AGN_1"}
//! ]
//! ```
//!
//! A silicate entry without `pairs_with` is shared by every AGN continuum
//! that has no silicate of its own.
//!
//! Files without a sidecar fall back to the historical column-name convention
//! via [`TemplateSchema::from_legacy_headers`].
//!
//! The store is immutable after loading and is shared by reference.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::TemplateKind;
use crate::error::SedError;

const WAVELENGTH_COLUMN: &str = "lambda_mic";

/// One schema row: which column holds which kind of template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub column: String,
    pub kind: TemplateKind,
    /// For `agn_silicate`: the continuum template it belongs to. Unset means
    /// shared by all continua.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairs_with: Option<String>,
}

/// Typed description of the template table's columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSchema {
    pub entries: Vec<SchemaEntry>,
}

impl TemplateSchema {
    pub fn from_json_path(path: &Path) -> Result<Self, SedError> {
        let file = File::open(path).map_err(|e| SedError::io(path, e))?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Infer the schema from header names using the legacy convention:
    /// `gal_PAH` is PAH, other `gal*` are dust continua, `AGN*Siem` are
    /// silicate emission, other `AGN*` are AGN continua. A silicate column
    /// pairs with the continuum named like it minus `Siem`; when there is no
    /// such continuum (`AGN_Siem`) it is shared. Uncertainty columns
    /// (`e<name>`) are skipped.
    pub fn from_legacy_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let names: Vec<&str> = headers.iter().map(|h| h.as_ref().trim()).collect();
        let is_error_column = |h: &str| {
            h.strip_prefix('e')
                .is_some_and(|rest| names.iter().any(|other| *other == rest))
        };

        let is_continuum = |h: &str| {
            names.contains(&h)
                && h.starts_with("AGN")
                && !h.ends_with("Siem")
                && !is_error_column(h)
        };

        let mut entries = Vec::new();
        for &h in &names {
            if h == WAVELENGTH_COLUMN || is_error_column(h) {
                continue;
            }
            let entry = if h == "gal_PAH" {
                SchemaEntry {
                    column: h.to_string(),
                    kind: TemplateKind::GalaxyPah,
                    pairs_with: None,
                }
            } else if h.starts_with("gal") {
                SchemaEntry {
                    column: h.to_string(),
                    kind: TemplateKind::GalaxyDust,
                    pairs_with: None,
                }
            } else if let Some(continuum) =
                h.strip_prefix("AGN").and_then(|_| h.strip_suffix("Siem"))
            {
                SchemaEntry {
                    column: h.to_string(),
                    kind: TemplateKind::AgnSilicate,
                    pairs_with: is_continuum(continuum).then(|| continuum.to_string()),
                }
            } else if h.starts_with("AGN") {
                SchemaEntry {
                    column: h.to_string(),
                    kind: TemplateKind::AgnContinuum,
                    pairs_with: None,
                }
            } else {
                continue;
            };
            entries.push(entry);
        }
        Self { entries }
    }
}

/// A named emission curve on the store's shared wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub kind: TemplateKind,
    /// For AGN silicate templates: the paired continuum.
    pub pairs_with: Option<String>,
    pub nu_lnu: Vec<f64>,
    pub nu_lnu_err: Vec<f64>,
}

/// Process-wide, read-only template table.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    wavelength: Vec<f64>,
    templates: Vec<Template>,
    index: HashMap<String, usize>,
}

impl TemplateStore {
    /// Build a store from in-memory curves, checking the shared-grid invariant.
    pub fn new(wavelength: Vec<f64>, templates: Vec<Template>) -> Result<Self, SedError> {
        if wavelength.len() < 2 {
            return Err(SedError::resource("template grid needs at least 2 wavelengths"));
        }
        if wavelength.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SedError::resource("template wavelengths must be finite and > 0"));
        }
        if wavelength.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SedError::resource(
                "template wavelengths must be strictly ascending order",
            ));
        }

        let mut index = HashMap::with_capacity(templates.len());
        for (i, t) in templates.iter().enumerate() {
            if t.nu_lnu.len() != wavelength.len() || t.nu_lnu_err.len() != wavelength.len() {
                return Err(SedError::resource(format!(
                    "template '{}' does not share the wavelength grid ({} points, expected {})",
                    t.name,
                    t.nu_lnu.len(),
                    wavelength.len()
                )));
            }
            if t.nu_lnu.iter().chain(&t.nu_lnu_err).any(|v| !v.is_finite()) {
                return Err(SedError::resource(format!(
                    "template '{}' contains non-finite values",
                    t.name
                )));
            }
            if index.insert(t.name.clone(), i).is_some() {
                return Err(SedError::resource(format!("duplicate template '{}'", t.name)));
            }
        }

        let shared: Vec<&str> = templates
            .iter()
            .filter(|t| t.kind == TemplateKind::AgnSilicate && t.pairs_with.is_none())
            .map(|t| t.name.as_str())
            .collect();
        if shared.len() > 1 {
            return Err(SedError::resource(format!(
                "more than one shared AGN silicate template ({})",
                shared.join(", ")
            )));
        }

        for t in &templates {
            if let Some(continuum) = &t.pairs_with {
                match index.get(continuum).map(|&i| templates[i].kind) {
                    Some(TemplateKind::AgnContinuum) => {}
                    _ => {
                        return Err(SedError::resource(format!(
                            "silicate template '{}' pairs with unknown AGN continuum '{continuum}'",
                            t.name
                        )));
                    }
                }
            }
        }

        Ok(Self {
            wavelength,
            templates,
            index,
        })
    }

    /// Load the template CSV. Without a schema the legacy header convention
    /// is used.
    pub fn load_csv(path: &Path, schema: Option<&TemplateSchema>) -> Result<Self, SedError> {
        let file = File::open(path).map_err(|e| SedError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let legacy;
        let schema = match schema {
            Some(s) => s,
            None => {
                legacy = TemplateSchema::from_legacy_headers(&headers);
                &legacy
            }
        };
        if schema.entries.is_empty() {
            return Err(SedError::resource(format!(
                "'{}': no template columns described",
                path.display()
            )));
        }

        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                SedError::resource(format!(
                    "'{}': missing template column `{name}`",
                    path.display()
                ))
            })
        };
        let wav_idx = column(WAVELENGTH_COLUMN)?;
        let mut columns = Vec::with_capacity(schema.entries.len());
        for entry in &schema.entries {
            let value_idx = column(&entry.column)?;
            let err_idx = column(&format!("e{}", entry.column))?;
            columns.push((entry, value_idx, err_idx));
        }

        let mut wavelength = Vec::new();
        let mut values = vec![Vec::new(); columns.len()];
        let mut errors = vec![Vec::new(); columns.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let line = row + 2;
            let cell = |idx: usize| -> Result<f64, SedError> {
                record
                    .get(idx)
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| {
                        SedError::resource(format!(
                            "'{}' line {line}: invalid number in column `{}`",
                            path.display(),
                            headers[idx]
                        ))
                    })
            };
            wavelength.push(cell(wav_idx)?);
            for (j, (_, value_idx, err_idx)) in columns.iter().enumerate() {
                values[j].push(cell(*value_idx)?);
                errors[j].push(cell(*err_idx)?);
            }
        }

        let templates = columns
            .iter()
            .zip(values.into_iter().zip(errors))
            .map(|((entry, _, _), (nu_lnu, nu_lnu_err))| Template {
                name: entry.column.clone(),
                kind: entry.kind,
                pairs_with: entry.pairs_with.clone(),
                nu_lnu,
                nu_lnu_err,
            })
            .collect();

        let store = Self::new(wavelength, templates)?;
        let unpaired = store
            .of_kind(TemplateKind::AgnContinuum)
            .filter(|c| store.silicate_for(&c.name).is_none())
            .count();
        if unpaired > 0 {
            warn!(unpaired, "AGN continua without a silicate template are not fitted");
        }
        info!(
            path = %path.display(),
            templates = store.templates.len(),
            points = store.wavelength.len(),
            "loaded template store"
        );
        Ok(store)
    }

    /// Shared rest-frame wavelength grid (microns).
    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn get(&self, name: &str) -> Result<&Template, SedError> {
        self.index
            .get(name)
            .map(|&i| &self.templates[i])
            .ok_or_else(|| SedError::resource(format!("unknown template '{name}'")))
    }

    pub fn of_kind(&self, kind: TemplateKind) -> impl Iterator<Item = &Template> {
        self.templates.iter().filter(move |t| t.kind == kind)
    }

    /// The PAH template used for every host reconstruction.
    pub fn pah(&self) -> Result<&Template, SedError> {
        self.of_kind(TemplateKind::GalaxyPah)
            .next()
            .ok_or_else(|| SedError::resource("template store has no PAH template"))
    }

    /// The silicate template paired with `continuum`, else the shared one.
    pub fn silicate_for(&self, continuum: &str) -> Option<&Template> {
        self.of_kind(TemplateKind::AgnSilicate)
            .find(|t| t.pairs_with.as_deref() == Some(continuum))
            .or_else(|| self.of_kind(TemplateKind::AgnSilicate).find(|t| t.pairs_with.is_none()))
    }

    /// `(continuum, silicate)` pairs available for template-mode AGN fits.
    pub fn agn_pairs(&self) -> Vec<(&Template, &Template)> {
        self.of_kind(TemplateKind::AgnContinuum)
            .filter_map(|c| self.silicate_for(&c.name).map(|s| (c, s)))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Small synthetic store: two dust continua, PAH, one AGN pair.
    pub(crate) fn toy_store() -> TemplateStore {
        let n = 400;
        let step = (1000f64.ln() - 1f64.ln()) / (n as f64 - 1.0);
        let wav: Vec<f64> = (0..n).map(|i| (step * i as f64).exp()).collect();

        let grey_body = |peak: f64| -> Vec<f64> {
            wav.iter()
                .map(|&l| {
                    let x = peak / l;
                    1e10 * x.powi(5) / ((1.5 * x).exp() - 1.0)
                })
                .collect()
        };
        let pah: Vec<f64> = wav
            .iter()
            .map(|&l| {
                1e9 * (crate::math::drude(l, 0.05, 7.7) + 0.6 * crate::math::drude(l, 0.04, 11.3))
                    + 1e7 * (l / 10.0).powi(-2).min(1.0)
            })
            .collect();
        let agn: Vec<f64> = wav
            .iter()
            .map(|&l| 1e10 * crate::math::agn_powerlaw(l, 20.0, 0.8, 0.2))
            .collect();
        let siem: Vec<f64> = wav
            .iter()
            .map(|&l| {
                1e9 * (crate::math::gaussian_profile(l, 11.0, 0.05)
                    + 0.5 * crate::math::gaussian_profile(l, 18.0, 0.07))
            })
            .collect();

        let mk = |name: &str, kind, pairs: Option<&str>, v: Vec<f64>| Template {
            name: name.to_string(),
            kind,
            pairs_with: pairs.map(str::to_string),
            nu_lnu_err: v.iter().map(|x| 0.05 * x).collect(),
            nu_lnu: v,
        };

        TemplateStore::new(
            wav.clone(),
            vec![
                mk("gal_1", TemplateKind::GalaxyDust, None, grey_body(60.0)),
                mk("gal_2", TemplateKind::GalaxyDust, None, grey_body(120.0)),
                mk("gal_PAH", TemplateKind::GalaxyPah, None, pah),
                mk("AGN_1", TemplateKind::AgnContinuum, None, agn),
                mk("AGN_1Siem", TemplateKind::AgnSilicate, Some("AGN_1"), siem),
            ],
        )
        .unwrap()
    }

    #[test]
    fn legacy_headers_map_to_kinds() {
        let headers = [
            "lambda_mic", "gal_1", "egal_1", "gal_PAH", "egal_PAH", "AGN_1", "eAGN_1",
            "AGN_1Siem", "eAGN_1Siem",
        ];
        let schema = TemplateSchema::from_legacy_headers(&headers);
        let kinds: Vec<_> = schema.entries.iter().map(|e| (e.column.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("gal_1", TemplateKind::GalaxyDust),
                ("gal_PAH", TemplateKind::GalaxyPah),
                ("AGN_1", TemplateKind::AgnContinuum),
                ("AGN_1Siem", TemplateKind::AgnSilicate),
            ]
        );
        assert_eq!(schema.entries[3].pairs_with.as_deref(), Some("AGN_1"));
    }

    #[test]
    fn schema_json_round_trips_kinds() {
        let json = r#"[{"column":"gal_PAH","kind":"galaxy_pah"},
                       {"column":"AGN_2Siem","kind":"agn_silicate","pairs_with":"AGN_2"}]"#;
        let schema: TemplateSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.entries[0].kind, TemplateKind::GalaxyPah);
        assert_eq!(schema.entries[1].pairs_with.as_deref(), Some("AGN_2"));
    }

    #[test]
    fn loads_csv_with_legacy_convention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            "lambda_mic,gal_1,egal_1,gal_PAH,egal_PAH,AGN_1,eAGN_1,AGN_1Siem,eAGN_1Siem"
        )
        .unwrap();
        for l in [1.0, 10.0, 100.0, 1000.0] {
            writeln!(f, "{l},1e9,1e8,2e8,2e7,5e9,5e8,1e8,1e7").unwrap();
        }
        drop(f);

        let store = TemplateStore::load_csv(&path, None).unwrap();
        assert_eq!(store.wavelength(), &[1.0, 10.0, 100.0, 1000.0]);
        assert_eq!(store.pah().unwrap().name, "gal_PAH");
        let pairs = store.agn_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.name, "AGN_1Siem");
    }

    #[test]
    fn shared_silicate_pairs_with_every_continuum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(
            f,
            "lambda_mic,gal_1,egal_1,gal_PAH,egal_PAH,AGN_1,eAGN_1,AGN_2,eAGN_2,AGN_Siem,eAGN_Siem"
        )
        .unwrap();
        for l in [1.0, 10.0, 100.0, 1000.0] {
            writeln!(f, "{l},1e9,1e8,2e8,2e7,5e9,5e8,4e9,4e8,1e8,1e7").unwrap();
        }
        drop(f);

        let store = TemplateStore::load_csv(&path, None).unwrap();
        assert_eq!(store.get("AGN_Siem").unwrap().pairs_with, None);
        let pairs: Vec<_> = store
            .agn_pairs()
            .iter()
            .map(|(c, s)| (c.name.as_str(), s.name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("AGN_1", "AGN_Siem"), ("AGN_2", "AGN_Siem")]);
    }

    #[test]
    fn own_silicate_wins_over_shared_one() {
        let headers = [
            "lambda_mic", "AGN_1", "eAGN_1", "AGN_2", "eAGN_2", "AGN_1Siem", "eAGN_1Siem",
            "AGNSiem", "eAGNSiem",
        ];
        let schema = TemplateSchema::from_legacy_headers(&headers);
        let siem: Vec<_> = schema
            .entries
            .iter()
            .filter(|e| e.kind == TemplateKind::AgnSilicate)
            .map(|e| (e.column.as_str(), e.pairs_with.as_deref()))
            .collect();
        assert_eq!(siem, vec![("AGN_1Siem", Some("AGN_1")), ("AGNSiem", None)]);

        let curve = |name: &str, kind, pairs: Option<&str>| Template {
            name: name.into(),
            kind,
            pairs_with: pairs.map(str::to_string),
            nu_lnu: vec![1.0, 1.0],
            nu_lnu_err: vec![0.1, 0.1],
        };
        let store = TemplateStore::new(
            vec![1.0, 2.0],
            vec![
                curve("AGN_1", TemplateKind::AgnContinuum, None),
                curve("AGN_2", TemplateKind::AgnContinuum, None),
                curve("AGN_1Siem", TemplateKind::AgnSilicate, Some("AGN_1")),
                curve("AGNSiem", TemplateKind::AgnSilicate, None),
            ],
        )
        .unwrap();
        assert_eq!(store.silicate_for("AGN_1").unwrap().name, "AGN_1Siem");
        assert_eq!(store.silicate_for("AGN_2").unwrap().name, "AGNSiem");
    }

    #[test]
    fn missing_error_column_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.csv");
        std::fs::write(&path, "lambda_mic,gal_1\n1,1\n2,1\n").unwrap();
        let schema = TemplateSchema {
            entries: vec![SchemaEntry {
                column: "gal_1".into(),
                kind: TemplateKind::GalaxyDust,
                pairs_with: None,
            }],
        };
        let err = TemplateStore::load_csv(&path, Some(&schema)).unwrap_err();
        assert!(err.to_string().contains("egal_1"), "{err}");
    }

    #[test]
    fn rejects_mismatched_grid() {
        let err = TemplateStore::new(
            vec![1.0, 2.0, 3.0],
            vec![Template {
                name: "gal_1".into(),
                kind: TemplateKind::GalaxyDust,
                pairs_with: None,
                nu_lnu: vec![1.0, 2.0],
                nu_lnu_err: vec![0.1, 0.2],
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("wavelength grid"));
    }
}
