//! Box-constrained Levenberg–Marquardt.
//!
//! Minimizes `‖r(p)‖²` for a residual vector `r` with a known Jacobian,
//! keeping every parameter inside `[lo, hi]`. Bounds are handled by
//! projection: each trial point is clamped onto the box before its cost is
//! evaluated. The iteration is fully deterministic.

use nalgebra::{DMatrix, DVector};

use crate::math::linalg::damped_step;

/// A nonlinear least squares problem.
pub trait LeastSquaresProblem {
    fn n_params(&self) -> usize;
    fn n_residuals(&self) -> usize;
    /// Write the (weighted) residuals at `p` into `out`.
    fn residuals(&self, p: &[f64], out: &mut DVector<f64>);
    /// Write `∂r/∂p` at `p` into `out` (`n_residuals × n_params`).
    fn jacobian(&self, p: &[f64], out: &mut DMatrix<f64>);
}

#[derive(Debug, Clone)]
pub struct LmConfig {
    pub max_iter: usize,
    /// Relative cost reduction below which an accepted step counts as converged.
    pub ftol: f64,
    /// Relative step size below which an accepted step counts as converged.
    pub xtol: f64,
    /// Gradient-cosine tolerance used when no further step improves the cost.
    pub gtol: f64,
    /// A stall right after an accepted step that improved the cost by less
    /// than this (relative) counts as converged.
    pub stall_rtol: f64,
    pub lambda_init: f64,
    pub lambda_max: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-8,
            stall_rtol: 1e-10,
            lambda_init: 1e-3,
            lambda_max: 1e16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// `‖r‖²` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
    pub message: String,
    /// Jacobian at `params`.
    pub jacobian: DMatrix<f64>,
}

pub fn clamp_params(params: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    params
        .iter()
        .zip(bounds.iter())
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect()
}

fn cost_at<P: LeastSquaresProblem>(problem: &P, p: &[f64], r: &mut DVector<f64>) -> f64 {
    problem.residuals(p, r);
    let c = r.norm_squared();
    if c.is_finite() { c } else { f64::INFINITY }
}

/// Whether parameter `i` sits on a bound that the descent direction `-g` pushes against.
fn pinned(x: f64, g: f64, (lo, hi): (f64, f64)) -> bool {
    const EPS: f64 = 1e-12;
    (x <= lo + EPS && g > 0.0) || (x >= hi - EPS && g < 0.0)
}

fn active_bounds(
    j: &DMatrix<f64>,
    r: &DVector<f64>,
    p: &[f64],
    bounds: &[(f64, f64)],
) -> Vec<usize> {
    let g = j.transpose() * r;
    p.iter()
        .zip(bounds.iter())
        .enumerate()
        .filter(|&(i, (&x, &b))| pinned(x, g[i], b))
        .map(|(i, _)| i)
        .collect()
}

/// Largest cosine between a free Jacobian column and the residual vector,
/// `max |Jᵢᵀr| / (‖Jᵢ‖·‖r‖)`, ignoring components that push out of the box.
///
/// Scale-free, so the same tolerance applies to raw counts and to
/// normalized, error-weighted histograms.
fn projected_gradient_cosine(
    j: &DMatrix<f64>,
    r: &DVector<f64>,
    p: &[f64],
    bounds: &[(f64, f64)],
) -> f64 {
    let r_norm = r.norm();
    if r_norm == 0.0 {
        return 0.0;
    }
    let g = j.transpose() * r;
    p.iter()
        .zip(bounds.iter())
        .enumerate()
        .filter(|&(i, (&x, &b))| !pinned(x, g[i], b))
        .map(|(i, _)| {
            let col = j.column(i).norm();
            if col == 0.0 { 0.0 } else { g[i].abs() / (col * r_norm) }
        })
        .fold(0.0, f64::max)
}

/// Run bounded Levenberg–Marquardt from `init`.
pub fn minimize<P: LeastSquaresProblem>(
    problem: &P,
    init: &[f64],
    bounds: &[(f64, f64)],
    config: &LmConfig,
) -> LmOutcome {
    let n = problem.n_residuals();
    let k = problem.n_params();

    let mut p = clamp_params(init, bounds);
    let mut r = DVector::<f64>::zeros(n);
    let mut r_trial = DVector::<f64>::zeros(n);
    let mut j = DMatrix::<f64>::zeros(n, k);

    let mut cost = cost_at(problem, &p, &mut r);
    let mut lambda = config.lambda_init;
    let mut last_rel_cost: Option<f64> = None;

    let finish = |p: Vec<f64>, cost: f64, iterations: usize, converged: bool, message: String| {
        let mut jac = DMatrix::<f64>::zeros(n, k);
        problem.jacobian(&p, &mut jac);
        LmOutcome {
            params: p,
            cost,
            iterations,
            converged,
            message,
            jacobian: jac,
        }
    };

    if !cost.is_finite() {
        return finish(p, cost, 0, false, "non-finite cost at the initial point".to_string());
    }

    for iter in 1..=config.max_iter {
        if cost == 0.0 {
            return finish(p, cost, iter - 1, true, "exact fit".to_string());
        }

        problem.jacobian(&p, &mut j);
        let scale: Vec<f64> = (0..k)
            .map(|c| j.column(c).norm().max(1e-12))
            .collect();

        // Parameters pinned at a bound with the descent direction pointing
        // outward are frozen for this step (zero Jacobian column => zero step).
        let mut j_free = j.clone();
        for c in active_bounds(&j, &r, &p, bounds) {
            j_free.column_mut(c).fill(0.0);
        }

        let mut accepted = None;
        while lambda <= config.lambda_max {
            let Some(step) = damped_step(&j_free, &r, &scale, lambda) else {
                lambda *= 10.0;
                continue;
            };
            let trial: Vec<f64> = p.iter().zip(step.iter()).map(|(a, b)| a + b).collect();
            let trial = clamp_params(&trial, bounds);
            let trial_cost = cost_at(problem, &trial, &mut r_trial);
            if trial_cost < cost {
                lambda = (lambda / 10.0).max(1e-15);
                accepted = Some((trial, trial_cost));
                break;
            }
            lambda *= 10.0;
        }

        let Some((trial, trial_cost)) = accepted else {
            // No damping level improves the cost: either we sit at a
            // (constrained) minimum or the problem is stuck.
            let g = projected_gradient_cosine(&j, &r, &p, bounds);
            let flat = last_rel_cost.is_some_and(|rc| rc <= config.stall_rtol);
            let converged = g <= config.gtol || flat;
            let message = if g <= config.gtol {
                "no further improvement; projected gradient vanishes".to_string()
            } else if let Some(rc) = last_rel_cost.filter(|_| flat) {
                format!("no further improvement after a {rc:.1e} relative decrease")
            } else {
                format!("stalled with projected gradient cosine {g:.3e}")
            };
            return finish(p, cost, iter, converged, message);
        };

        let rel_cost = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
        let step_norm: f64 = p
            .iter()
            .zip(trial.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        let p_norm: f64 = p.iter().map(|v| v * v).sum::<f64>().sqrt();

        log::debug!(
            "lm iter {iter}: cost {trial_cost:.6e} lambda {lambda:.1e} step {step_norm:.3e}"
        );

        p = trial;
        cost = trial_cost;
        last_rel_cost = Some(rel_cost);
        std::mem::swap(&mut r, &mut r_trial);

        if rel_cost <= config.ftol {
            return finish(p, cost, iter, true, "relative cost reduction below ftol".to_string());
        }
        if step_norm <= config.xtol * (p_norm + config.xtol) {
            return finish(p, cost, iter, true, "step size below xtol".to_string());
        }
    }

    finish(
        p,
        cost,
        config.max_iter,
        false,
        format!("maximum iterations ({}) reached", config.max_iter),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fit `y = a·exp(b·x)`.
    struct ExpProblem {
        xs: Vec<f64>,
        ys: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpProblem {
        fn n_params(&self) -> usize {
            2
        }
        fn n_residuals(&self) -> usize {
            self.xs.len()
        }
        fn residuals(&self, p: &[f64], out: &mut DVector<f64>) {
            for (i, (&x, &y)) in self.xs.iter().zip(&self.ys).enumerate() {
                out[i] = p[0] * (p[1] * x).exp() - y;
            }
        }
        fn jacobian(&self, p: &[f64], out: &mut DMatrix<f64>) {
            for (i, &x) in self.xs.iter().enumerate() {
                let e = (p[1] * x).exp();
                out[(i, 0)] = e;
                out[(i, 1)] = p[0] * x * e;
            }
        }
    }

    fn problem() -> ExpProblem {
        let xs: Vec<f64> = (0..10).map(|i| i as f64 * 0.2).collect();
        let ys = xs.iter().map(|x| 2.0 * (0.5 * x).exp()).collect();
        ExpProblem { xs, ys }
    }

    #[test]
    fn recovers_unconstrained_minimum() {
        let bounds = [(0.0, 10.0), (-5.0, 5.0)];
        let out = minimize(&problem(), &[1.0, 0.1], &bounds, &LmConfig::default());
        assert!(out.converged, "{}", out.message);
        assert!((out.params[0] - 2.0).abs() < 1e-6);
        assert!((out.params[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn respects_bounds() {
        let bounds = [(0.0, 1.5), (-5.0, 5.0)];
        let out = minimize(&problem(), &[1.0, 0.1], &bounds, &LmConfig::default());
        assert!(out.params[0] <= 1.5);
        assert!(out.converged, "{}", out.message);
    }

    #[test]
    fn initial_point_is_clamped() {
        let out = minimize(
            &problem(),
            &[100.0, 0.5],
            &[(0.0, 10.0), (-5.0, 5.0)],
            &LmConfig { max_iter: 0, ..LmConfig::default() },
        );
        assert_eq!(out.params[0], 10.0);
        assert!(!out.converged);
    }

    /// Fit `y = a + b·x` with large residuals left over at the minimum.
    struct LineProblem {
        xs: Vec<f64>,
        ys: Vec<f64>,
    }

    impl LeastSquaresProblem for LineProblem {
        fn n_params(&self) -> usize {
            2
        }
        fn n_residuals(&self) -> usize {
            self.xs.len()
        }
        fn residuals(&self, p: &[f64], out: &mut DVector<f64>) {
            for (i, (&x, &y)) in self.xs.iter().zip(&self.ys).enumerate() {
                out[i] = 1e3 * (p[0] + p[1] * x - y);
            }
        }
        fn jacobian(&self, _p: &[f64], out: &mut DMatrix<f64>) {
            for (i, &x) in self.xs.iter().enumerate() {
                out[(i, 0)] = 1e3;
                out[(i, 1)] = 1e3 * x;
            }
        }
    }

    #[test]
    fn starting_at_a_weighted_minimum_converges() {
        let xs: Vec<f64> = (-10..=10).map(|i| i as f64 * 0.3).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 5.0 + 0.7 * x + if i % 3 == 0 { 0.4 } else { -0.2 })
            .collect();
        // Symmetric xs: the least squares solution is (mean(y), Σxy / Σx²).
        let a = ys.iter().sum::<f64>() / ys.len() as f64;
        let b = xs.iter().zip(&ys).map(|(x, y)| x * y).sum::<f64>()
            / xs.iter().map(|x| x * x).sum::<f64>();
        let problem = LineProblem { xs, ys };

        let bounds = [(-100.0, 100.0), (-100.0, 100.0)];
        let out = minimize(&problem, &[a, b], &bounds, &LmConfig::default());
        assert!(out.converged, "{}", out.message);
        assert!(out.cost > 1e3);
        assert!((out.params[0] - a).abs() < 1e-9);
        assert!((out.params[1] - b).abs() < 1e-9);
    }
}
