//! Weighted cosine fit of a histogram.
//!
//! Given bin centers `xᵢ`, contents `yᵢ` and errors `σᵢ` we minimize
//!
//! ```text
//! χ² = Σ wᵢ (A·cos(B·xᵢ + C) + D − yᵢ)²
//! ```
//!
//! with bounded Levenberg–Marquardt (`math::lm`). Parameter errors come from
//! the covariance `(JᵀWJ)⁻¹` at the minimum.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitParam, FitResult, FitWeighting};
use crate::error::AppError;
use crate::fit::guess::initial_guess;
use crate::hist::Histogram;
use crate::math::{LeastSquaresProblem, LmConfig, minimize, normal_inverse};
use crate::models::{N_PARAMS, fill_jacobian_row, predict};

/// Options that affect how each histogram is fitted.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub weighting: FitWeighting,
    pub lm: LmConfig,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            weighting: FitWeighting::Errors,
            lm: LmConfig::default(),
        }
    }
}

struct CosineProblem {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// `√wᵢ`
    sw: Vec<f64>,
}

fn as_params(p: &[f64]) -> [f64; N_PARAMS] {
    [p[0], p[1], p[2], p[3]]
}

impl LeastSquaresProblem for CosineProblem {
    fn n_params(&self) -> usize {
        N_PARAMS
    }

    fn n_residuals(&self) -> usize {
        self.xs.len()
    }

    fn residuals(&self, p: &[f64], out: &mut DVector<f64>) {
        let p = as_params(p);
        for i in 0..self.xs.len() {
            out[i] = self.sw[i] * (predict(&p, self.xs[i]) - self.ys[i]);
        }
    }

    fn jacobian(&self, p: &[f64], out: &mut DMatrix<f64>) {
        let p = as_params(p);
        let mut row = [0.0; N_PARAMS];
        for i in 0..self.xs.len() {
            fill_jacobian_row(&p, self.xs[i], &mut row);
            for (k, v) in row.iter().enumerate() {
                out[(i, k)] = self.sw[i] * v;
            }
        }
    }
}

/// `√w` per bin for the chosen weighting.
fn sqrt_weights(errors: &[f64], weighting: FitWeighting) -> Vec<f64> {
    match weighting {
        FitWeighting::Uniform => vec![1.0; errors.len()],
        FitWeighting::Errors => {
            let floor = errors
                .iter()
                .copied()
                .filter(|e| e.is_finite() && *e > 0.0)
                .fold(f64::INFINITY, f64::min);
            if !floor.is_finite() {
                return vec![1.0; errors.len()];
            }
            errors
                .iter()
                .map(|&e| {
                    let e = if e.is_finite() && e > 0.0 { e } else { floor };
                    1.0 / e
                })
                .collect()
        }
    }
}

/// Fit `A·cos(B·x + C) + D` to a histogram.
///
/// Returns an error (and no result) when the optimizer does not converge or
/// the covariance cannot be formed.
pub fn fit_cosine(hist: &Histogram, opts: &FitOptions) -> Result<FitResult, AppError> {
    let guess = initial_guess(hist.contents())
        .map_err(|e| AppError::internal(format!("Fit of '{}' skipped: {e}", hist.name)))?;

    let problem = CosineProblem {
        xs: hist.centers(),
        ys: hist.contents().to_vec(),
        sw: sqrt_weights(&hist.errors(), opts.weighting),
    };

    let outcome = minimize(&problem, &guess.params, &guess.bounds, &opts.lm);
    if !outcome.converged {
        return Err(AppError::internal(format!(
            "Fit of '{}' did not converge after {} iteration(s): {}.",
            hist.name, outcome.iterations, outcome.message
        )));
    }

    let n = problem.xs.len() as i64;
    let ndf = n - N_PARAMS as i64;
    let chi2 = outcome.cost;
    let chi2_ndf = if ndf > 0 { chi2 / ndf as f64 } else { -1.0 };

    let cov = normal_inverse(&outcome.jacobian).ok_or_else(|| {
        AppError::internal(format!(
            "Fit of '{}' converged but the covariance matrix is singular.",
            hist.name
        ))
    })?;
    let cov_scale = match opts.weighting {
        FitWeighting::Uniform if ndf > 0 => chi2_ndf,
        _ => 1.0,
    };

    let mut params = [FitParam { value: 0.0, error: 0.0 }; N_PARAMS];
    for k in 0..N_PARAMS {
        let var = cov[(k, k)] * cov_scale;
        if !(var.is_finite() && var >= 0.0) {
            return Err(AppError::internal(format!(
                "Fit of '{}' produced an invalid variance for parameter {k}.",
                hist.name
            )));
        }
        params[k] = FitParam {
            value: outcome.params[k],
            error: var.sqrt(),
        };
    }

    log::debug!(
        "Fit '{}' converged in {} iteration(s): {}",
        hist.name,
        outcome.iterations,
        outcome.message
    );

    Ok(FitResult {
        name: hist.name.clone(),
        amplitude: params[0],
        frequency: params[1],
        phase: params[2],
        offset: params[3],
        chi2,
        ndf,
        chi2_ndf,
        iterations: outcome.iterations,
    })
}

/// Fit each histogram independently, in order.
///
/// A failed fit is logged and yields `None` for that entry; the others are
/// unaffected.
pub fn fit_all(hists: &[Histogram], opts: &FitOptions) -> Vec<Option<FitResult>> {
    hists
        .iter()
        .map(|h| match fit_cosine(h, opts) {
            Ok(fit) => Some(fit),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthBranch, SynthConfig, generate_table};
    use crate::domain::{BinGeometry, CutSet};
    use crate::hist::{build_histogram, normalize};
    use std::f64::consts::FRAC_PI_2;

    fn synthetic(a: f64, c: f64, d: f64) -> Histogram {
        let g = BinGeometry::phi_cp();
        let contents: Vec<f64> = (0..g.bins)
            .map(|i| predict(&[a, 1.0, c, d], g.center(i)))
            .collect();
        Histogram::from_contents("synthetic", g, &contents).unwrap()
    }

    #[test]
    fn recovers_noiseless_cosine() {
        let h = synthetic(30.0, 1.0, 100.0);
        let fit = fit_cosine(&h, &FitOptions::default()).unwrap();
        assert!((fit.amplitude.value - 30.0).abs() < 1e-4, "{fit:?}");
        assert!((fit.frequency.value - 1.0).abs() < 1e-6);
        assert!((fit.phase.value - 1.0).abs() < 1e-4);
        assert!((fit.offset.value - 100.0).abs() < 1e-4);
        assert_eq!(fit.ndf, 46);
        assert!(fit.chi2_ndf >= 0.0 && fit.chi2_ndf < 1e-6);
        assert!(fit.amplitude.error.is_finite() && fit.amplitude.error > 0.0);
    }

    #[test]
    fn parameters_stay_inside_bounds() {
        let h = synthetic(20.0, FRAC_PI_2, 50.0);
        let fit = fit_cosine(&h, &FitOptions::default()).unwrap();
        let guess = initial_guess(h.contents()).unwrap();
        for (v, (lo, hi)) in fit.params().iter().zip(guess.bounds.iter()) {
            assert!(*v >= *lo && *v <= *hi);
        }
    }

    #[test]
    fn fit_is_deterministic() {
        let h = synthetic(12.0, 2.0, 40.0);
        let a = fit_cosine(&h, &FitOptions::default()).unwrap();
        let b = fit_cosine(&h, &FitOptions::default()).unwrap();
        for (x, y) in a.params().iter().zip(b.params().iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
        assert_eq!(a.chi2.to_bits(), b.chi2.to_bits());
    }

    #[test]
    fn ndf_non_positive_reports_minus_one() {
        let g = BinGeometry::new(4, 0.0, std::f64::consts::TAU).unwrap();
        let contents: Vec<f64> = (0..4)
            .map(|i| predict(&[5.0, 1.0, 1.0, 10.0], g.center(i)))
            .collect();
        let h = Histogram::from_contents("tiny", g, &contents).unwrap();
        let fit = fit_cosine(&h, &FitOptions::default()).unwrap();
        assert_eq!(fit.ndf, 0);
        assert_eq!(fit.chi2_ndf, -1.0);
    }

    #[test]
    fn flat_histogram_yields_no_result() {
        let g = BinGeometry::phi_cp();
        let h = Histogram::new("empty", g);
        assert!(fit_cosine(&h, &FitOptions::default()).is_err());
    }

    #[test]
    fn fit_all_is_partial_failure_tolerant() {
        let hists = vec![
            synthetic(30.0, 1.0, 100.0),
            Histogram::new("empty", BinGeometry::phi_cp()),
            synthetic(10.0, 3.0, 40.0),
        ];
        let fits = fit_all(&hists, &FitOptions::default());
        assert_eq!(fits.len(), 3);
        assert!(fits[0].is_some());
        assert!(fits[1].is_none());
        assert!(fits[2].is_some());
    }

    #[test]
    fn uniform_weighting_scales_errors() {
        let g = BinGeometry::phi_cp();
        let contents: Vec<f64> = (0..g.bins)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.5 } else { -0.5 };
                predict(&[30.0, 1.0, 1.0, 100.0], g.center(i)) + wobble
            })
            .collect();
        let h = Histogram::from_contents("noisy", g, &contents).unwrap();
        let opts = FitOptions {
            weighting: FitWeighting::Uniform,
            ..FitOptions::default()
        };
        let fit = fit_cosine(&h, &opts).unwrap();
        assert!(fit.chi2_ndf > 0.0);
        assert!(fit.offset.error > 0.0);
        assert!((fit.offset.value - 100.0).abs() < 0.5);
    }

    fn generated_histogram(seed: u64, amplitude: f64, phase: f64) -> Histogram {
        let mut cfg = SynthConfig::cp_pair(20_000, seed);
        cfg.branches = vec![SynthBranch {
            name: "phiCP_tau_pi".into(),
            amplitude,
            phase,
        }];
        let table = generate_table(&cfg).unwrap();
        let geom = BinGeometry::phi_cp();
        let mut h = build_histogram("generated", &table, "phiCP_tau_pi", &CutSet::new(), geom, None)
            .unwrap();
        normalize(&mut h);
        h
    }

    #[test]
    fn noisy_normalized_histograms_converge() {
        for seed in 18..=22 {
            let h = generated_histogram(seed, 0.4, FRAC_PI_2);
            for weighting in [FitWeighting::Errors, FitWeighting::Uniform] {
                let opts = FitOptions {
                    weighting,
                    ..FitOptions::default()
                };
                let fit = fit_cosine(&h, &opts)
                    .unwrap_or_else(|e| panic!("seed {seed} {weighting:?}: {e}"));
                let depth = fit.amplitude.value / fit.offset.value;
                assert!((depth - 0.4).abs() < 0.1, "seed {seed}: A/D = {depth}");
                let phase = fit.phase.value;
                assert!((phase - FRAC_PI_2).abs() < 0.5, "seed {seed}: C = {phase}");
            }
        }
    }
}
