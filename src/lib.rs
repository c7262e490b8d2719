//! `sedsep` library crate.
//!
//! Decomposes infrared SEDs into AGN and host-galaxy components. The binary
//! (`sedsep`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - resources are injected explicitly (`TemplateStore`, `FilterBank`)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod derive;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod physics;
pub mod report;
pub mod validate;
