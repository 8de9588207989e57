//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - built from CLI flags or prompt answers
//! - passed explicitly through the pipeline (no ambient state)
//! - dumped to JSON alongside the text report

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Inclusive numeric range applied to the absolute value of a column.
///
/// A missing bound leaves that side unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CutRange {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl CutRange {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// Whether `value` passes this cut. Non-finite values never pass.
    pub fn accepts(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let v = value.abs();
        if let Some(lo) = self.lower {
            if v < lo {
                return false;
            }
        }
        if let Some(hi) = self.upper {
            if v > hi {
                return false;
            }
        }
        true
    }
}

/// Column name → cut range. An empty set accepts every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CutSet {
    cuts: BTreeMap<String, CutRange>,
}

impl CutSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, range: CutRange) {
        self.cuts.insert(column.into(), range);
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Iterate cuts in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CutRange)> {
        self.cuts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse cut expressions of the form `name:lower:upper`.
    ///
    /// Either bound may be empty (`tau_pt:20:` or `eta::2.5`). A bare `name`
    /// is rejected because it would not constrain anything.
    pub fn parse<S: AsRef<str>>(exprs: &[S]) -> Result<Self, AppError> {
        let mut set = CutSet::new();
        for expr in exprs {
            let expr = expr.as_ref().trim();
            if expr.is_empty() {
                continue;
            }
            let (name, range) = parse_cut_expr(expr)?;
            set.insert(name, range);
        }
        Ok(set)
    }
}

fn parse_cut_expr(expr: &str) -> Result<(String, CutRange), AppError> {
    let parts: Vec<&str> = expr.split(':').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(AppError::config(format!(
            "Invalid cut '{expr}'. Expected `name:lower:upper` (bounds may be empty)."
        )));
    }
    let name = parts[0];
    if name.is_empty() {
        return Err(AppError::config(format!("Invalid cut '{expr}': missing column name.")));
    }
    let lower = parse_bound(parts[1], expr)?;
    let upper = parse_bound(parts[2], expr)?;
    if lower.is_none() && upper.is_none() {
        return Err(AppError::config(format!("Invalid cut '{expr}': both bounds are empty.")));
    }
    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo > hi {
            return Err(AppError::config(format!(
                "Invalid cut '{expr}': lower bound {lo} exceeds upper bound {hi}."
            )));
        }
    }
    Ok((name.to_string(), CutRange::new(lower, upper)))
}

fn parse_bound(s: &str, expr: &str) -> Result<Option<f64>, AppError> {
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(AppError::config(format!("Invalid cut '{expr}': '{s}' is not a finite number."))),
    }
}

/// Which bin a value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSlot {
    Underflow,
    Bin(usize),
    Overflow,
}

/// Fixed binning: `bins` equal-width bins over `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinGeometry {
    pub bins: usize,
    pub lower: f64,
    pub upper: f64,
}

impl BinGeometry {
    pub fn new(bins: usize, lower: f64, upper: f64) -> Result<Self, AppError> {
        if bins == 0 {
            return Err(AppError::config("Bin count must be > 0."));
        }
        if !(lower.is_finite() && upper.is_finite()) || upper <= lower {
            return Err(AppError::config(format!(
                "Invalid bin range [{lower}, {upper}]: upper must exceed lower."
            )));
        }
        Ok(Self { bins, lower, upper })
    }

    /// The φ_CP default: 50 bins over `[0, 2π]`.
    pub fn phi_cp() -> Self {
        Self {
            bins: 50,
            lower: 0.0,
            upper: TAU,
        }
    }

    pub fn width(&self) -> f64 {
        (self.upper - self.lower) / self.bins as f64
    }

    pub fn center(&self, index: usize) -> f64 {
        self.lower + (index as f64 + 0.5) * self.width()
    }

    pub fn edge(&self, index: usize) -> f64 {
        self.lower + index as f64 * self.width()
    }

    /// Locate `value`: lower-inclusive, upper-exclusive, except the final bin
    /// which also includes `upper`.
    pub fn slot(&self, value: f64) -> BinSlot {
        if value < self.lower {
            return BinSlot::Underflow;
        }
        if value > self.upper {
            return BinSlot::Overflow;
        }
        if value == self.upper {
            return BinSlot::Bin(self.bins - 1);
        }
        let mut idx = ((value - self.lower) / self.width()).floor() as usize;
        // Rounding in the division can land one bin off at an exact edge.
        if idx >= self.bins {
            idx = self.bins - 1;
        }
        if idx + 1 < self.bins && value >= self.edge(idx + 1) {
            idx += 1;
        } else if idx > 0 && value < self.edge(idx) {
            idx -= 1;
        }
        BinSlot::Bin(idx)
    }
}

/// One fitted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParam {
    pub value: f64,
    pub error: f64,
}

/// Converged fit of `A·cos(B·x + C) + D` to one histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub name: String,
    pub amplitude: FitParam,
    pub frequency: FitParam,
    pub phase: FitParam,
    pub offset: FitParam,
    pub chi2: f64,
    pub ndf: i64,
    /// `chi2 / ndf`, or `-1` when `ndf <= 0`.
    pub chi2_ndf: f64,
    pub iterations: usize,
}

impl FitResult {
    pub fn params(&self) -> [f64; 4] {
        [
            self.amplitude.value,
            self.frequency.value,
            self.phase.value,
            self.offset.value,
        ]
    }
}

/// How bins are weighted in the fit objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitWeighting {
    /// `1/σ²` from bin errors; zero errors fall back to the smallest positive error.
    Errors,
    /// Every bin counts equally; parameter errors are scaled by chi²/ndf.
    Uniform,
}

/// Everything the plot pipeline needs, resolved from flags or prompt answers.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Catalog labels, in selection order.
    pub samples: Vec<String>,
    /// Branches to histogram, in selection order.
    pub branches: Vec<String>,
    /// Second branch for 2-D mode.
    pub y_branch: Option<String>,
    pub cuts: CutSet,
    pub geometry: BinGeometry,
    pub y_geometry: BinGeometry,
    pub weight_column: Option<String>,
    pub fit: bool,
    pub weighting: FitWeighting,
    pub output_base: String,
    pub out_dir: PathBuf,
    pub ascii: bool,
    pub json: bool,
    pub plot_width: u32,
    pub plot_height: u32,
}

impl PipelineConfig {
    pub fn is_2d(&self) -> bool {
        self.y_branch.is_some()
    }
}

/// Default value marking an invalid entry in analysis tables.
pub const INVALID_SENTINEL: f64 = -99.0;
