//! Input/output helpers.
//!
//! - observation CSV ingest (`ingest`)
//! - fitting output table write/read (`results`)
//! - derived-quantity exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod results;

pub use export::*;
pub use ingest::*;
pub use results::*;
