//! Evaluation of the periodic model `y(x) = A·cos(B·x + C) + D`.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` given the parameters (for residuals/plots)
//! - fill a Jacobian row `∂y/∂(A, B, C, D)` at `x` (for the LM step)

/// Number of model parameters (`A, B, C, D`).
pub const N_PARAMS: usize = 4;

/// Parameter labels in report order.
pub const PARAM_NAMES: [&str; N_PARAMS] = ["A", "B", "C", "D"];

/// Predict `y(x)`.
pub fn predict(params: &[f64; N_PARAMS], x: f64) -> f64 {
    let [a, b, c, d] = *params;
    a * (b * x + c).cos() + d
}

/// Fill the Jacobian row at `x`.
pub fn fill_jacobian_row(params: &[f64; N_PARAMS], x: f64, out: &mut [f64; N_PARAMS]) {
    let [a, b, c, _] = *params;
    let arg = b * x + c;
    let (s, co) = arg.sin_cos();
    out[0] = co;
    out[1] = -a * x * s;
    out[2] = -a * s;
    out[3] = 1.0;
}

/// Sample the model on `n` evenly spaced points over `[x0, x1]`.
pub fn sample_curve(params: &[f64; N_PARAMS], x0: f64, x1: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x0 + u * (x1 - x0);
            (x, predict(params, x))
        })
        .collect()
}
