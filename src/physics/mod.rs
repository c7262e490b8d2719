//! Radiative and cosmological utilities.
//!
//! - luminosity distance (`cosmology`)
//! - nuLnu <-> observed flux, synthetic photometry, band luminosities (`flux`)
//! - silicate extinction curve (`extinction`)

pub mod cosmology;
pub mod extinction;
pub mod flux;

pub use cosmology::*;
pub use extinction::*;
pub use flux::*;
