//! Fill histograms from table columns under a cut set.
//!
//! All column names (target, weight, cuts) are resolved against the schema
//! before any row is touched, so an unknown column fails the whole build
//! with a clear error instead of silently producing an empty histogram.

use crate::domain::{BinGeometry, CutRange, CutSet};
use crate::error::AppError;
use crate::hist::{Histogram, Histogram2D};
use crate::io::Table;

/// Cuts resolved to column slices.
struct ResolvedCuts<'a> {
    cuts: Vec<(&'a [f64], CutRange)>,
}

impl<'a> ResolvedCuts<'a> {
    fn resolve(table: &'a Table, cuts: &CutSet) -> Result<Self, AppError> {
        let cuts = cuts
            .iter()
            .map(|(name, range)| Ok((table.column(name)?, *range)))
            .collect::<Result<Vec<_>, AppError>>()?;
        Ok(Self { cuts })
    }

    fn accepts(&self, row: usize) -> bool {
        self.cuts.iter().all(|(col, range)| range.accepts(col[row]))
    }
}

/// Row mask: `true` where the row passes every cut.
pub fn select_rows(table: &Table, cuts: &CutSet) -> Result<Vec<bool>, AppError> {
    let resolved = ResolvedCuts::resolve(table, cuts)?;
    Ok((0..table.n_rows()).map(|row| resolved.accepts(row)).collect())
}

/// Fill a 1-D histogram of `column` from every row passing `cuts`.
///
/// Each accepted row contributes its `weight_column` value, or 1.
pub fn build_histogram(
    name: impl Into<String>,
    table: &Table,
    column: &str,
    cuts: &CutSet,
    geometry: BinGeometry,
    weight_column: Option<&str>,
) -> Result<Histogram, AppError> {
    let values = table.column(column)?;
    let weights = weight_column.map(|w| table.column(w)).transpose()?;
    let resolved = ResolvedCuts::resolve(table, cuts)?;

    let mut hist = Histogram::new(name, geometry);
    for (row, &v) in values.iter().enumerate() {
        if !resolved.accepts(row) {
            continue;
        }
        let w = weights.map(|w| w[row]).unwrap_or(1.0);
        hist.fill_weighted(v, w);
    }
    Ok(hist)
}

/// Fill a 2-D histogram of `(x_column, y_column)` from every row passing `cuts`.
pub fn build_histogram_2d(
    name: impl Into<String>,
    table: &Table,
    x_column: &str,
    y_column: &str,
    cuts: &CutSet,
    x_geometry: BinGeometry,
    y_geometry: BinGeometry,
    weight_column: Option<&str>,
) -> Result<Histogram2D, AppError> {
    let xs = table.column(x_column)?;
    let ys = table.column(y_column)?;
    let weights = weight_column.map(|w| table.column(w)).transpose()?;
    let resolved = ResolvedCuts::resolve(table, cuts)?;

    let mut hist = Histogram2D::new(name, x_geometry, y_geometry);
    for (row, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
        if !resolved.accepts(row) {
            continue;
        }
        let w = weights.map(|w| w[row]).unwrap_or(1.0);
        hist.fill_weighted(x, y, w);
    }
    Ok(hist)
}
