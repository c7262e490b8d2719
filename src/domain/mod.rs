//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - template and run configuration enums (`TemplateKind`, `ModeSpec`, `Band`)
//! - validated observations (`Observation`, `Photometry`, `Spectrum`)
//! - fit outputs (`CandidateModel`, `ModelSelection`, `DerivedQuantities`)

pub mod types;

pub use types::*;
