//! One-dimensional histogram with per-bin variance.

use serde::{Deserialize, Serialize};

use crate::domain::{BinGeometry, BinSlot};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub name: String,
    geometry: BinGeometry,
    contents: Vec<f64>,
    /// Sum of squared weights per bin (the bin variance).
    sumw2: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: usize,
    normalized: bool,
}

impl Histogram {
    pub fn new(name: impl Into<String>, geometry: BinGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
            contents: vec![0.0; geometry.bins],
            sumw2: vec![0.0; geometry.bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
            normalized: false,
        }
    }

    /// Build a histogram from known bin contents with Poisson variances.
    pub fn from_contents(
        name: impl Into<String>,
        geometry: BinGeometry,
        contents: &[f64],
    ) -> Result<Self, AppError> {
        if contents.len() != geometry.bins {
            return Err(AppError::config(format!(
                "Expected {} bin contents, got {}.",
                geometry.bins,
                contents.len()
            )));
        }
        let mut h = Self::new(name, geometry);
        h.contents.copy_from_slice(contents);
        for (v, &c) in h.sumw2.iter_mut().zip(contents) {
            *v = c.abs();
        }
        Ok(h)
    }

    pub fn fill(&mut self, value: f64) {
        self.fill_weighted(value, 1.0);
    }

    /// Add `weight` to the bin containing `value`. Non-finite input is ignored.
    pub fn fill_weighted(&mut self, value: f64, weight: f64) {
        if !value.is_finite() || !weight.is_finite() {
            return;
        }
        self.entries += 1;
        match self.geometry.slot(value) {
            BinSlot::Underflow => self.underflow += weight,
            BinSlot::Overflow => self.overflow += weight,
            BinSlot::Bin(i) => {
                self.contents[i] += weight;
                self.sumw2[i] += weight * weight;
            }
        }
    }

    pub fn geometry(&self) -> &BinGeometry {
        &self.geometry
    }

    pub fn bin_width(&self) -> f64 {
        self.geometry.width()
    }

    pub fn n_bins(&self) -> usize {
        self.geometry.bins
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn content(&self, i: usize) -> f64 {
        self.contents[i]
    }

    pub fn error(&self, i: usize) -> f64 {
        self.sumw2[i].sqrt()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.sumw2.iter().map(|v| v.sqrt()).collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        (0..self.geometry.bins).map(|i| self.geometry.center(i)).collect()
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fill calls with finite input (including under/overflow).
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    pub fn max_content(&self) -> f64 {
        self.contents.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_content(&self) -> f64 {
        self.contents.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub(crate) fn mark_normalized(&mut self) {
        self.normalized = true;
    }

    /// Multiply every bin content (and error) by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.contents {
            *c *= factor;
        }
        let f2 = factor * factor;
        for v in &mut self.sumw2 {
            *v *= f2;
        }
        self.underflow *= factor;
        self.overflow *= factor;
    }

    /// Points tracing the histogram outline as steps.
    pub fn step_points(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::with_capacity(self.contents.len() * 2);
        for (i, &c) in self.contents.iter().enumerate() {
            out.push((self.geometry.edge(i), c));
            out.push((self.geometry.edge(i + 1), c));
        }
        out
    }
}
