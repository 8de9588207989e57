//! Synthetic analysis tables.
//!
//! Each φ_CP branch is drawn from the density `∝ 1 + a·cos(x + δ)` on
//! `[0, 2π)` by accept–reject, so the resulting histograms are exactly the
//! shape the cosine fit expects. Kinematic columns are Gaussian. A fraction
//! of φ_CP entries is replaced by the invalid sentinel to mimic events where
//! the observable could not be reconstructed.

use std::f64::consts::TAU;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::INVALID_SENTINEL;
use crate::error::AppError;
use crate::io::{Column, ColumnKind, Schema, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct SynthBranch {
    pub name: String,
    /// Modulation depth `a` (|a| ≤ 1).
    pub amplitude: f64,
    /// Phase `δ`.
    pub phase: f64,
}

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub rows: usize,
    pub seed: u64,
    pub run_number: i64,
    pub branches: Vec<SynthBranch>,
    /// Fraction of φ_CP entries set to the invalid sentinel.
    pub invalid_fraction: f64,
}

impl SynthConfig {
    /// Default branches mirroring the CP-even (δ = 0) / CP-odd (δ = π) pair.
    pub fn cp_pair(rows: usize, seed: u64) -> Self {
        Self {
            rows,
            seed,
            run_number: 410_000,
            branches: vec![
                SynthBranch {
                    name: "phiCP_tau_pi".to_string(),
                    amplitude: 0.3,
                    phase: 0.0,
                },
                SynthBranch {
                    name: "phiCP_neutrino_pi".to_string(),
                    amplitude: 0.6,
                    phase: 0.0,
                },
            ],
            invalid_fraction: 0.1,
        }
    }
}

/// Parse `name[:amplitude[:phase]]`.
pub fn parse_branch_spec(spec: &str) -> Result<SynthBranch, AppError> {
    let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
    if parts.is_empty() || parts[0].is_empty() || parts.len() > 3 {
        return Err(AppError::config(format!(
            "Invalid branch spec '{spec}'. Expected `name[:amplitude[:phase]]`."
        )));
    }
    let num = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AppError::config(format!("Invalid number '{s}' in branch spec '{spec}'."))
            })
    };
    let amplitude = parts.get(1).map(|s| num(s)).transpose()?.unwrap_or(0.3);
    let phase = parts.get(2).map(|s| num(s)).transpose()?.unwrap_or(0.0);
    Ok(SynthBranch {
        name: parts[0].to_string(),
        amplitude,
        phase,
    })
}

fn validate(config: &SynthConfig) -> Result<(), AppError> {
    if config.rows == 0 {
        return Err(AppError::config("Row count must be > 0."));
    }
    if config.branches.is_empty() {
        return Err(AppError::config("At least one φ_CP branch is required."));
    }
    if !(0.0..1.0).contains(&config.invalid_fraction) {
        return Err(AppError::config("Invalid fraction must be in [0, 1)."));
    }
    for b in &config.branches {
        if !(b.amplitude.abs() <= 1.0) {
            return Err(AppError::config(format!(
                "Branch '{}': |amplitude| must be ≤ 1 for a valid density.",
                b.name
            )));
        }
    }
    Ok(())
}

fn sample_phi(rng: &mut StdRng, amplitude: f64, phase: f64) -> f64 {
    let ceiling = 1.0 + amplitude.abs();
    loop {
        let x = rng.gen_range(0.0..TAU);
        let u = rng.gen_range(0.0..ceiling);
        if u <= 1.0 + amplitude * (x + phase).cos() {
            return x;
        }
    }
}

/// Generate a table with `run_number`, `event_number`, `tau_pt`, `tau_eta`
/// and one column per configured φ_CP branch.
pub fn generate_table(config: &SynthConfig) -> Result<Table, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let pt = Normal::new(45.0_f64, 15.0)
        .map_err(|e| AppError::internal(format!("Noise distribution error: {e}")))?;
    let eta = Normal::new(0.0_f64, 1.2)
        .map_err(|e| AppError::internal(format!("Noise distribution error: {e}")))?;

    let mut columns = vec![
        Column { name: "run_number".to_string(), kind: ColumnKind::I64 },
        Column { name: "event_number".to_string(), kind: ColumnKind::I64 },
        Column { name: "tau_pt".to_string(), kind: ColumnKind::F64 },
        Column { name: "tau_eta".to_string(), kind: ColumnKind::F64 },
    ];
    columns.extend(config.branches.iter().map(|b| Column {
        name: b.name.clone(),
        kind: ColumnKind::F64,
    }));
    let schema = Schema::new(columns)?;

    let n = config.rows;
    let mut data: Vec<Vec<f64>> = vec![Vec::with_capacity(n); schema.len()];
    for i in 0..n {
        data[0].push(config.run_number as f64);
        data[1].push((i + 1) as f64);
        data[2].push(pt.sample(&mut rng).abs());
        data[3].push(eta.sample(&mut rng));
        for (k, b) in config.branches.iter().enumerate() {
            let v = if rng.gen_bool(config.invalid_fraction) {
                INVALID_SENTINEL
            } else {
                sample_phi(&mut rng, b.amplitude, b.phase)
            };
            data[4 + k].push(v);
        }
    }

    Table::from_columns(schema, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_table() {
        let cfg = SynthConfig::cp_pair(200, 7);
        let a = generate_table(&cfg).unwrap();
        let b = generate_table(&cfg).unwrap();
        assert_eq!(a.column("phiCP_tau_pi").unwrap(), b.column("phiCP_tau_pi").unwrap());
        assert_eq!(a.n_rows(), 200);
    }

    #[test]
    fn phi_values_are_in_range_or_sentinel() {
        let cfg = SynthConfig::cp_pair(500, 1);
        let t = generate_table(&cfg).unwrap();
        let phi = t.column("phiCP_neutrino_pi").unwrap();
        assert!(phi.iter().all(|&v| v == INVALID_SENTINEL || (0.0..TAU).contains(&v)));
        let invalid = phi.iter().filter(|&&v| v == INVALID_SENTINEL).count();
        assert!(invalid > 0 && invalid < 150);
    }

    #[test]
    fn parses_branch_specs() {
        let b = parse_branch_spec("phiCP_x:0.5:2.5").unwrap();
        assert_eq!(b.name, "phiCP_x");
        assert_eq!(b.amplitude, 0.5);
        assert_eq!(b.phase, 2.5);
        assert_eq!(parse_branch_spec("y").unwrap().amplitude, 0.3);
        assert!(parse_branch_spec("").is_err());
        assert!(parse_branch_spec("y:abc").is_err());
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = SynthConfig::cp_pair(10, 1);
        cfg.branches[0].amplitude = 1.5;
        assert!(generate_table(&cfg).is_err());
        let cfg = SynthConfig::cp_pair(0, 1);
        assert!(generate_table(&cfg).is_err());
    }
}
