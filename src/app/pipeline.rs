//! Shared pipeline logic behind the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resources -> ingest -> validate -> fit/select -> derive -> residuals
//!
//! The subcommand handlers can then focus on presentation and exports.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::ResourceArgs;
use crate::data::{FilterBank, TemplateSchema, TemplateStore};
use crate::derive::derive_all;
use crate::domain::{DerivedQuantities, DerivedSummary, FitConfig, Observation};
use crate::error::SedError;
use crate::fit::{fit_and_select, FitSelection};
use crate::io::ResultsTable;
use crate::physics::Cosmology;
use crate::report::{compute_residuals, PointResidual};

/// Environment variable naming the default resource directory.
pub const DATA_DIR_ENV: &str = "SEDSEP_DATA_DIR";

/// Resolved resource file locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePaths {
    pub templates: PathBuf,
    pub schema: Option<PathBuf>,
    pub filters: PathBuf,
}

impl ResourcePaths {
    /// Fill unset paths from `SEDSEP_DATA_DIR` (a `.env` file is honoured).
    pub fn from_args_and_env(args: &ResourceArgs) -> Result<Self, SedError> {
        dotenvy::dotenv().ok();
        let data_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        Self::resolve(args, data_dir.as_deref())
    }

    fn resolve(args: &ResourceArgs, data_dir: Option<&Path>) -> Result<Self, SedError> {
        let from_dir = |name: &str, flag: &str| {
            data_dir.map(|d| d.join(name)).ok_or_else(|| {
                SedError::resource(format!("{flag} not given and {DATA_DIR_ENV} is not set"))
            })
        };
        let templates = match &args.templates {
            Some(p) => p.clone(),
            None => from_dir("templates.csv", "--templates")?,
        };
        let filters = match &args.filters {
            Some(p) => p.clone(),
            None => from_dir("filters", "--filters")?,
        };
        let schema = args
            .schema
            .clone()
            .or_else(|| data_dir.map(|d| d.join("templates.json")).filter(|p| p.is_file()));
        Ok(Self {
            templates,
            schema,
            filters,
        })
    }
}

/// Everything a fit needs besides the observation.
#[derive(Debug, Clone)]
pub struct Resources {
    pub cosmology: Cosmology,
    pub store: TemplateStore,
    pub bank: FilterBank,
}

impl Resources {
    pub fn load(paths: &ResourcePaths) -> Result<Self, SedError> {
        let schema = paths
            .schema
            .as_deref()
            .map(TemplateSchema::from_json_path)
            .transpose()?;
        let store = TemplateStore::load_csv(&paths.templates, schema.as_ref())?;
        let bank = FilterBank::load_dir(&paths.filters)?;
        Ok(Self {
            cosmology: Cosmology::wmap9(),
            store,
            bank,
        })
    }
}

/// All computed outputs of a single `sedsep fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub selection: FitSelection,
    pub derived: Vec<DerivedQuantities>,
    pub summary: DerivedSummary,
    /// Residuals of the best model.
    pub residuals: Vec<PointResidual>,
}

/// Validate, fit, select, and derive for one observation.
pub fn run_fit(
    resources: &Resources,
    obs: &Observation,
    config: &FitConfig,
) -> Result<RunOutput, SedError> {
    let Resources {
        cosmology,
        store,
        bank,
    } = resources;

    crate::validate::validate_observation(obs, bank)?;
    let selection = fit_and_select(cosmology, store, bank, obs, config)?;
    let (derived, summary) = derive_all(store, &selection.models, &selection.selection)?;
    let residuals = compute_residuals(cosmology, store, bank, obs, selection.best())?;

    info!(
        best = %summary.best_label,
        sfr = summary.sfr_averaged,
        "fit complete"
    );
    Ok(RunOutput {
        selection,
        derived,
        summary,
        residuals,
    })
}

/// Derived quantities for a saved fitting output table.
pub fn run_derive(
    store: &TemplateStore,
    table: &ResultsTable,
) -> Result<(Vec<DerivedQuantities>, DerivedSummary), SedError> {
    derive_all(store, &table.models, &table.selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(templates: Option<&str>) -> ResourceArgs {
        ResourceArgs {
            templates: templates.map(PathBuf::from),
            schema: None,
            filters: Some(PathBuf::from("my/filters")),
        }
    }

    #[test]
    fn explicit_paths_need_no_data_dir() {
        let paths = ResourcePaths::resolve(&args(Some("t.csv")), None).unwrap();
        assert_eq!(paths.templates, PathBuf::from("t.csv"));
        assert_eq!(paths.filters, PathBuf::from("my/filters"));
        assert_eq!(paths.schema, None);
    }

    #[test]
    fn missing_path_falls_back_to_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("templates.json"), "[]").unwrap();
        let paths = ResourcePaths::resolve(&args(None), Some(dir.path())).unwrap();
        assert_eq!(paths.templates, dir.path().join("templates.csv"));
        assert_eq!(paths.schema, Some(dir.path().join("templates.json")));

        let err = ResourcePaths::resolve(&args(None), None).unwrap_err();
        assert!(err.to_string().contains(DATA_DIR_ENV));
    }
}
