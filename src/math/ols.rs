//! Weighted least squares solver.
//!
//! For fixed shape parameters (`tau9p7`, break wavelength, slopes) every model
//! flux is linear in the component normalizations, so each grid point of the
//! fitter solves a small problem of the form:
//!
//! ```text
//! minimize Σ w_i (f_i - x_i^T c)^2
//! ```
//!
//! where `x_i` holds the flux each unit-normalized component contributes to
//! data point `i`.
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least squares problem.
//! - We use SVD so tall (more rows than columns) systems solve robustly.
//! - Component fluxes span many decades, so columns are rescaled to unit norm
//!   before the solve and the coefficients are scaled back afterwards.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Weighted least squares over component columns.
///
/// `columns[j][i]` is the contribution of component `j` to data point `i`.
/// Returns one coefficient per component, or `None` when the system is
/// degenerate (empty, all-zero column, or unsolvable).
pub fn solve_weighted(columns: &[Vec<f64>], y: &[f64], w: &[f64]) -> Option<Vec<f64>> {
    let n = y.len();
    let p = columns.len();
    if n == 0 || p == 0 || w.len() != n || columns.iter().any(|c| c.len() != n) {
        return None;
    }

    let mut scales = Vec::with_capacity(p);
    for col in columns {
        let norm = col
            .iter()
            .zip(w)
            .map(|(&x, &wi)| wi * x * x)
            .sum::<f64>()
            .sqrt();
        if !(norm.is_finite() && norm > 0.0) {
            return None;
        }
        scales.push(norm);
    }

    let mut xw = DMatrix::<f64>::zeros(n, p);
    let mut yw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sw = w[i].sqrt();
        for j in 0..p {
            xw[(i, j)] = columns[j][i] * sw / scales[j];
        }
        yw[i] = y[i] * sw;
    }

    let beta = solve_least_squares(&xw, &yw)?;
    Some(beta.iter().zip(&scales).map(|(b, s)| b / s).collect())
}
