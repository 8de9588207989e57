//! Two-dimensional histogram over an `nx × ny` grid.

use serde::{Deserialize, Serialize};

use crate::domain::{BinGeometry, BinSlot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub name: String,
    x: BinGeometry,
    y: BinGeometry,
    /// Row-major: index `iy * nx + ix`.
    contents: Vec<f64>,
    sumw2: Vec<f64>,
    outside: f64,
    entries: usize,
    normalized: bool,
}

impl Histogram2D {
    pub fn new(name: impl Into<String>, x: BinGeometry, y: BinGeometry) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            contents: vec![0.0; x.bins * y.bins],
            sumw2: vec![0.0; x.bins * y.bins],
            outside: 0.0,
            entries: 0,
            normalized: false,
        }
    }

    pub fn fill_weighted(&mut self, xv: f64, yv: f64, weight: f64) {
        if !(xv.is_finite() && yv.is_finite() && weight.is_finite()) {
            return;
        }
        self.entries += 1;
        match (self.x.slot(xv), self.y.slot(yv)) {
            (BinSlot::Bin(ix), BinSlot::Bin(iy)) => {
                let k = iy * self.x.bins + ix;
                self.contents[k] += weight;
                self.sumw2[k] += weight * weight;
            }
            _ => self.outside += weight,
        }
    }

    pub fn x_geometry(&self) -> &BinGeometry {
        &self.x
    }

    pub fn y_geometry(&self) -> &BinGeometry {
        &self.y
    }

    pub fn content(&self, ix: usize, iy: usize) -> f64 {
        self.contents[iy * self.x.bins + ix]
    }

    pub fn error(&self, ix: usize, iy: usize) -> f64 {
        self.sumw2[iy * self.x.bins + ix].sqrt()
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Weight that landed outside the grid on either axis.
    pub fn outside(&self) -> f64 {
        self.outside
    }

    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Area of a single cell.
    pub fn bin_area(&self) -> f64 {
        self.x.width() * self.y.width()
    }

    pub fn max_content(&self) -> f64 {
        self.contents.iter().copied().fold(0.0, f64::max)
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    pub(crate) fn mark_normalized(&mut self) {
        self.normalized = true;
    }

    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.contents {
            *c *= factor;
        }
        let f2 = factor * factor;
        for v in &mut self.sumw2 {
            *v *= f2;
        }
        self.outside *= factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_grid_and_outside() {
        let g = BinGeometry::new(2, 0.0, 2.0).unwrap();
        let mut h = Histogram2D::new("h2", g, g);
        h.fill_weighted(0.5, 1.5, 1.0);
        h.fill_weighted(2.0, 2.0, 1.0);
        h.fill_weighted(2.5, 0.5, 1.0);
        assert_eq!(h.content(0, 1), 1.0);
        assert_eq!(h.content(1, 1), 1.0);
        assert_eq!(h.outside(), 1.0);
        assert_eq!(h.integral(), 2.0);
        assert_eq!(h.entries(), 3);
        assert!((h.bin_area() - 1.0).abs() < 1e-15);
    }
}
