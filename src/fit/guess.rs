//! Initial guesses and parameter bounds for the cosine fit.
//!
//! The objective is non-convex in the frequency and phase, so the starting
//! point and a tight box matter more than the optimizer:
//!
//! - `A₀ = (max − min) / 2`, bounded to `[0.5·A₀, 1.5·A₀]`
//! - `B₀ = 1`, bounded to `[0.95, 1.05]`
//! - `C₀ = π/2`, bounded to `[0, 2π]`
//! - `D₀ = (max + min) / 2`, bounded to `[min, max]`

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::AppError;
use crate::models::N_PARAMS;

/// Half-width of the frequency band around 1.
pub const FREQUENCY_BAND: f64 = 0.05;

/// Relative half-width of the amplitude band around `A₀`.
pub const AMPLITUDE_BAND: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct InitialGuess {
    pub params: [f64; N_PARAMS],
    pub bounds: [(f64, f64); N_PARAMS],
}

/// Derive the starting point and box from the extrema of `contents`.
pub fn initial_guess(contents: &[f64]) -> Result<InitialGuess, AppError> {
    if contents.is_empty() {
        return Err(AppError::internal("Cannot fit an empty histogram."));
    }
    if contents.iter().any(|c| !c.is_finite()) {
        return Err(AppError::internal("Histogram contains non-finite bin contents."));
    }
    let max = contents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = contents.iter().copied().fold(f64::INFINITY, f64::min);

    let a0 = (max - min) / 2.0;
    let d0 = (max + min) / 2.0;
    if !(a0 > 0.0) {
        return Err(AppError::internal(
            "Histogram is flat (max == min); the amplitude guess is zero.",
        ));
    }

    Ok(InitialGuess {
        params: [a0, 1.0, FRAC_PI_2, d0],
        bounds: [
            (a0 * (1.0 - AMPLITUDE_BAND), a0 * (1.0 + AMPLITUDE_BAND)),
            (1.0 - FREQUENCY_BAND, 1.0 + FREQUENCY_BAND),
            (0.0, TAU),
            (min, max),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_from_extrema() {
        let g = initial_guess(&[0.1, 0.3, 0.2]).unwrap();
        assert!((g.params[0] - 0.1).abs() < 1e-12);
        assert_eq!(g.params[1], 1.0);
        assert_eq!(g.params[2], FRAC_PI_2);
        assert!((g.params[3] - 0.2).abs() < 1e-12);
        assert!((g.bounds[0].0 - 0.05).abs() < 1e-12);
        assert!((g.bounds[0].1 - 0.15).abs() < 1e-12);
        assert_eq!(g.bounds[3], (0.1, 0.3));
        assert_eq!(g.bounds[2], (0.0, TAU));
    }

    #[test]
    fn flat_or_empty_is_rejected() {
        assert!(initial_guess(&[]).is_err());
        assert!(initial_guess(&[0.0, 0.0, 0.0]).is_err());
        assert!(initial_guess(&[1.0, f64::NAN]).is_err());
    }
}
