//! Fitting and model selection.
//!
//! Responsibilities:
//!
//! - score model fluxes against censored measurements (`likelihood`)
//! - grid-search each template combination, normalizations by weighted LSQ (`fitter`)
//! - rank the fitted candidates by AIC / AICc and Akaike weights (`selection`)

pub mod fitter;
pub mod grid;
pub mod likelihood;
pub mod selection;

pub use fitter::*;
pub use grid::*;
pub use likelihood::*;
pub use selection::*;
