//! Small dense linear-algebra helpers on top of `nalgebra`.
//!
//! The Levenberg–Marquardt step is a linear least squares problem
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! which we solve as an ordinary least squares problem on the augmented
//! system `[J; √λ·D] δ = [-r; 0]`. SVD keeps this well-behaved when `J` is
//! nearly rank deficient (e.g. a vanishing amplitude decouples the phase).

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

/// Solve the damped Gauss–Newton step for Jacobian `j`, residuals `r` and damping `lambda`.
///
/// `scale` holds the Marquardt diagonal (one entry per parameter).
pub fn damped_step(
    j: &DMatrix<f64>,
    r: &DVector<f64>,
    scale: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let (n, p) = j.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);
    a.view_mut((0, 0), (n, p)).copy_from(j);
    for i in 0..n {
        b[i] = -r[i];
    }
    let sl = lambda.sqrt();
    for k in 0..p {
        a[(n + k, k)] = sl * scale[k];
    }
    solve_least_squares(&a, &b)
}

/// Inverse of the normal matrix `JᵀJ`, or `None` when it is singular.
pub fn normal_inverse(j: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let jtj = j.transpose() * j;
    let inv = jtj.try_inverse()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
