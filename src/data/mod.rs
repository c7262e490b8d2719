//! Static resources and synthetic inputs.
//!
//! - `templates`: the emission template table
//! - `filters`: photometric passbands
//! - `sample`: synthetic photometry drawn from a known model

pub mod filters;
pub mod sample;
pub mod templates;

pub use filters::*;
pub use sample::*;
pub use templates::*;
