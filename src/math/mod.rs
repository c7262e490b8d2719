//! Mathematical utilities: quadrature, interpolation, line profiles, the
//! error function and weighted least squares.

pub mod integrate;
pub mod ols;
pub mod profiles;
pub mod special;

pub use integrate::*;
pub use ols::*;
pub use profiles::*;
pub use special::*;
