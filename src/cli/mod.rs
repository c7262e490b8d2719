//! Command-line parsing for the SED decomposition tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/physics code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModeSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "sedsep",
    version,
    about = "Infrared SED decomposition into AGN and host-galaxy components"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pre-flight checks on an observation without fitting.
    Check(CheckArgs),
    /// Fit every candidate model, select among them, and report.
    Fit(FitArgs),
    /// Compute derived quantities from a saved fitting output table.
    Derive(DeriveArgs),
    /// List the filters found in the filter directory.
    Filters(ResourceArgs),
}

/// Template and filter locations.
///
/// Unset paths default to `$SEDSEP_DATA_DIR/templates.csv`,
/// `$SEDSEP_DATA_DIR/templates.json` (if present) and `$SEDSEP_DATA_DIR/filters`.
#[derive(Debug, Args, Clone)]
pub struct ResourceArgs {
    /// Template table CSV (`lambda_mic`, `<name>`, `e<name>` columns).
    #[arg(long, value_name = "CSV")]
    pub templates: Option<PathBuf>,

    /// JSON schema assigning a kind to each template column.
    ///
    /// Without one, kinds are inferred from the legacy column-name prefixes.
    #[arg(long, value_name = "JSON")]
    pub schema: Option<PathBuf>,

    /// Directory holding `<FILTER>Filter.csv` transmission curves.
    #[arg(long, value_name = "DIR")]
    pub filters: Option<PathBuf>,
}

/// The observation to process.
#[derive(Debug, Args, Clone)]
pub struct ObservationArgs {
    /// Photometry CSV (`wavelength,flux,eflux,filter[,upper_limit]`).
    #[arg(short = 'p', long, value_name = "CSV")]
    pub photometry: PathBuf,

    /// Optional spectrum CSV (`wavelength,flux,eflux`).
    #[arg(short = 's', long, value_name = "CSV")]
    pub spectrum: Option<PathBuf>,

    /// Source redshift (must be > 0).
    #[arg(short = 'z', long)]
    pub redshift: f64,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub observation: ObservationArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub observation: ObservationArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,

    /// AGN reconstruction (auto: analytic with a spectrum, template otherwise).
    #[arg(long, value_enum, default_value_t = ModeSpec::Auto)]
    pub mode: ModeSpec,

    /// Fit galaxy-only models.
    #[arg(long)]
    pub no_agn: bool,

    /// Use plain AIC instead of AICc.
    #[arg(long)]
    pub no_correction: bool,

    /// Minimum silicate optical depth at 9.7 um.
    #[arg(long, default_value_t = 0.0)]
    pub tau_min: f64,

    /// Maximum silicate optical depth at 9.7 um.
    #[arg(long, default_value_t = 3.0)]
    pub tau_max: f64,

    /// Optical depth grid steps.
    #[arg(long, default_value_t = 7)]
    pub tau_steps: usize,

    /// Minimum power-law break wavelength (um, analytic mode).
    #[arg(long, default_value_t = 10.0)]
    pub l_break_min: f64,

    /// Maximum power-law break wavelength (um, analytic mode).
    #[arg(long, default_value_t = 30.0)]
    pub l_break_max: f64,

    /// Break wavelength grid steps.
    #[arg(long, default_value_t = 5)]
    pub l_break_steps: usize,

    /// Minimum power-law slope (analytic mode).
    #[arg(long, default_value_t = -0.5, allow_hyphen_values = true)]
    pub alpha_min: f64,

    /// Maximum power-law slope (analytic mode).
    #[arg(long, default_value_t = 1.5, allow_hyphen_values = true)]
    pub alpha_max: f64,

    /// Slope grid steps (per slope).
    #[arg(long, default_value_t = 5)]
    pub alpha_steps: usize,

    /// Likelihood weight of each spectral point relative to photometry.
    #[arg(long, default_value_t = 1.0)]
    pub spectrum_weight: f64,

    /// Print observed vs. model flux of the best model at every point.
    #[arg(long)]
    pub residuals: bool,

    /// Write the fitting output table (one row per candidate model).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    /// Export derived quantities to CSV.
    #[arg(long, value_name = "CSV")]
    pub derived_csv: Option<PathBuf>,

    /// Export derived quantities and the model-averaged SFR to JSON.
    #[arg(long, value_name = "JSON")]
    pub derived_json: Option<PathBuf>,
}

/// Options for deriving quantities from a saved fit.
#[derive(Debug, Args, Clone)]
pub struct DeriveArgs {
    /// Fitting output table written by `sedsep fit --out`.
    #[arg(short = 'r', long, value_name = "CSV")]
    pub results: PathBuf,

    #[command(flatten)]
    pub resources: ResourceArgs,

    /// Export derived quantities to CSV.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Export derived quantities and the model-averaged SFR to JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_args_parse_with_defaults() {
        let cli = Cli::parse_from([
            "sedsep",
            "fit",
            "-p",
            "phot.csv",
            "-z",
            "0.3",
            "--alpha-min",
            "-1",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.observation.redshift, 0.3);
        assert_eq!(args.mode, ModeSpec::Auto);
        assert_eq!(args.alpha_min, -1.0);
        assert_eq!(args.tau_steps, 7);
        assert!(args.resources.templates.is_none());
        assert!(!args.no_agn);
    }

    #[test]
    fn derive_requires_results() {
        assert!(Cli::try_parse_from(["sedsep", "derive"]).is_err());
        let cli =
            Cli::try_parse_from(["sedsep", "derive", "-r", "fit.csv", "--json", "d.json"]).unwrap();
        assert!(matches!(cli.command, Command::Derive(_)));
    }
}
