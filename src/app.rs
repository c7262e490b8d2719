//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - loads templates and filters
//! - runs validation, fitting, selection and derivation
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, Command, DeriveArgs, FitArgs, ResourceArgs};
use crate::domain::FitConfig;
use crate::error::SedError;
use crate::io::{
    load_observation, read_results_csv, write_derived_csv, write_derived_json, write_results_csv,
};

pub mod pipeline;

use pipeline::{ResourcePaths, Resources};

/// Entry point for the `sedsep` binary.
pub fn run() -> Result<(), SedError> {
    init_tracing();
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Check(args) => handle_check(args),
        Command::Fit(args) => handle_fit(args),
        Command::Derive(args) => handle_derive(args),
        Command::Filters(args) => handle_filters(args),
    }
}

/// Log to stderr so stdout carries only reports. `RUST_LOG` overrides the
/// default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_resources(args: &ResourceArgs) -> Result<Resources, SedError> {
    let paths = ResourcePaths::from_args_and_env(args)?;
    Resources::load(&paths)
}

fn handle_check(args: CheckArgs) -> Result<(), SedError> {
    let paths = ResourcePaths::from_args_and_env(&args.resources)?;
    let bank = crate::data::FilterBank::load_dir(&paths.filters)?;
    let obs = load_observation(
        &args.observation.photometry,
        args.observation.spectrum.as_deref(),
        args.observation.redshift,
    )?;
    crate::validate::validate_observation(&obs, &bank)?;
    println!(
        "OK: {} photometric point(s), {} spectral point(s), z={}",
        obs.photometry.len(),
        obs.spectrum.as_ref().map_or(0, |s| s.len()),
        obs.redshift
    );
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), SedError> {
    let config = fit_config_from_args(&args);
    let resources = load_resources(&args.resources)?;
    let obs = load_observation(
        &args.observation.photometry,
        args.observation.spectrum.as_deref(),
        args.observation.redshift,
    )?;

    let run = pipeline::run_fit(&resources, &obs, &config)?;

    println!("{}", crate::report::format_fit_summary(&obs, &run.selection, &config));
    if args.residuals {
        println!("Residuals of the best model:");
        println!("{}", crate::report::format_residuals(&run.residuals));
    }
    println!("{}", crate::report::format_derived(&run.derived, &run.summary));

    // Optional exports.
    if let Some(path) = &args.out {
        write_results_csv(
            path,
            run.selection.mode,
            &run.selection.models,
            &run.selection.selection,
        )?;
        info!(path = %path.display(), "wrote fitting output table");
    }
    if let Some(path) = &args.derived_csv {
        write_derived_csv(path, &run.derived)?;
    }
    if let Some(path) = &args.derived_json {
        write_derived_json(path, &run.derived, &run.summary)?;
    }
    Ok(())
}

fn handle_derive(args: DeriveArgs) -> Result<(), SedError> {
    let resources = load_resources(&args.resources)?;
    let table = read_results_csv(&args.results)?;
    let (rows, summary) = pipeline::run_derive(&resources.store, &table)?;

    println!("{}", crate::report::format_derived(&rows, &summary));
    if let Some(path) = &args.csv {
        write_derived_csv(path, &rows)?;
    }
    if let Some(path) = &args.json {
        write_derived_json(path, &rows, &summary)?;
    }
    Ok(())
}

fn handle_filters(args: ResourceArgs) -> Result<(), SedError> {
    let paths = ResourcePaths::from_args_and_env(&args)?;
    let bank = crate::data::FilterBank::load_dir(&paths.filters)?;
    println!("{:<12} {:>10} {:>10} {:>10}", "filter", "mean_um", "lo_um", "hi_um");
    for filter in bank.iter() {
        let (lo, hi) = filter.sensitive_range();
        println!(
            "{:<12} {:>10.3} {:>10.3} {:>10.3}",
            filter.name().as_str(),
            filter.mean_wavelength(),
            lo,
            hi
        );
    }
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        mode: args.mode,
        corrected: !args.no_correction,
        with_agn: !args.no_agn,
        tau_min: args.tau_min,
        tau_max: args.tau_max,
        tau_steps: args.tau_steps,
        l_break_min: args.l_break_min,
        l_break_max: args.l_break_max,
        l_break_steps: args.l_break_steps,
        alpha_min: args.alpha_min,
        alpha_max: args.alpha_max,
        alpha_steps: args.alpha_steps,
        spectrum_weight: args.spectrum_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    #[test]
    fn cli_defaults_match_fit_config_defaults() {
        let cli = Cli::parse_from(["sedsep", "fit", "-p", "p.csv", "-z", "0.1"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        let default = FitConfig::default();
        assert_eq!(config.mode, default.mode);
        assert_eq!(config.corrected, default.corrected);
        assert_eq!(config.with_agn, default.with_agn);
        assert_eq!(config.tau_steps, default.tau_steps);
        assert_eq!((config.alpha_min, config.alpha_max), (default.alpha_min, default.alpha_max));
        assert_eq!(config.l_break_steps, default.l_break_steps);
    }

    #[test]
    fn flags_switch_off_agn_and_correction() {
        let cli = Cli::parse_from([
            "sedsep",
            "fit",
            "-p",
            "p.csv",
            "-z",
            "0.1",
            "--no-agn",
            "--no-correction",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        assert!(!config.with_agn);
        assert!(!config.corrected);
    }
}
