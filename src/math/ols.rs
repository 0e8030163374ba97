//! Ordinary least squares solver.
//!
//! The formulation core solves one linear regression problem per refit:
//!
//! ```text
//! minimize ||Y - X W||_F
//! ```
//!
//! where X is the design matrix (samples × predictors-plus-constant) and Y
//! stacks all three smoke-yield responses as columns, so a single solve
//! produces the whole coefficient block.
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - SVD also gives us least-norm behavior on rank-deficient designs, which
//!   replicated-column sample sets produce in practice; the caller decides
//!   whether to surface that as an error.
//! - The parameter dimension is tiny (6 columns), so SVD cost is irrelevant.

use nalgebra::DMatrix;

/// Solve a least-squares problem with a matrix right-hand side using SVD.
///
/// Returns one solution column per column of `y`. Returns `None` if the
/// system is too ill-conditioned to produce finite coefficients.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(w) = svd.solve(y, tol) {
            if w.iter().all(|v| v.is_finite()) {
                return Some(w);
            }
        }
    }

    None
}
