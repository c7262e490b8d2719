//! Model curve reconstruction.
//!
//! Components are built as plain vectors on the template grid so fitting,
//! derivation and synthetic sampling can share them.

pub mod model;

pub use model::*;
