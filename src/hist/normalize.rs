//! Unit-area normalization.
//!
//! After normalization a histogram approximates a probability density:
//! `Σ content[i] · width = 1`. Zero-integral histograms are left untouched.

use crate::hist::{Histogram, Histogram2D};

/// What `normalize` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeOutcome {
    /// Contents were divided by `integral × bin_width`.
    Scaled { integral: f64, factor: f64 },
    /// Integral was zero (or not finite); contents unchanged.
    ZeroIntegral,
    /// The histogram had already been normalized; contents unchanged.
    AlreadyNormalized,
}

/// Scale `hist` by `1 / (integral × bin_width)` unless the integral is zero.
///
/// This is the raw step with no memory of earlier calls. Prefer `normalize`.
pub fn scale_by_integral(hist: &mut Histogram) -> NormalizeOutcome {
    let integral = hist.integral();
    let denom = integral * hist.bin_width();
    if integral == 0.0 || !denom.is_finite() || denom == 0.0 {
        log::warn!(
            "Histogram '{}' has zero integral, skipping normalization.",
            hist.name
        );
        return NormalizeOutcome::ZeroIntegral;
    }
    let factor = 1.0 / denom;
    hist.scale(factor);
    NormalizeOutcome::Scaled { integral, factor }
}

/// Normalize `hist` to unit area, at most once.
pub fn normalize(hist: &mut Histogram) -> NormalizeOutcome {
    if hist.is_normalized() {
        log::debug!("Histogram '{}' already normalized.", hist.name);
        return NormalizeOutcome::AlreadyNormalized;
    }
    let outcome = scale_by_integral(hist);
    if let NormalizeOutcome::Scaled { integral, .. } = outcome {
        log::info!(
            "Normalizing histogram '{}' with integral {integral:.0}.",
            hist.name
        );
        hist.mark_normalized();
    }
    outcome
}

/// Normalize a 2-D histogram by `integral × cell_area`, at most once.
pub fn normalize_2d(hist: &mut Histogram2D) -> NormalizeOutcome {
    if hist.is_normalized() {
        return NormalizeOutcome::AlreadyNormalized;
    }
    let integral = hist.integral();
    let denom = integral * hist.bin_area();
    if integral == 0.0 || !denom.is_finite() || denom == 0.0 {
        log::warn!(
            "Histogram '{}' has zero integral, skipping normalization.",
            hist.name
        );
        return NormalizeOutcome::ZeroIntegral;
    }
    let factor = 1.0 / denom;
    hist.scale(factor);
    hist.mark_normalized();
    NormalizeOutcome::Scaled { integral, factor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BinGeometry;

    fn unit_bins(contents: &[f64]) -> Histogram {
        let g = BinGeometry::new(contents.len(), 0.0, contents.len() as f64).unwrap();
        Histogram::from_contents("h", g, contents).unwrap()
    }

    #[test]
    fn normalizes_to_expected_bins() {
        let mut h = unit_bins(&[10.0, 5.0, 10.0]);
        let outcome = normalize(&mut h);
        assert_eq!(
            outcome,
            NormalizeOutcome::Scaled {
                integral: 25.0,
                factor: 1.0 / 25.0
            }
        );
        let expected = [0.4, 0.2, 0.4];
        for (c, e) in h.contents().iter().zip(expected) {
            assert!((c - e).abs() < 1e-12);
        }
        assert!((h.error(0) - 10.0_f64.sqrt() / 25.0).abs() < 1e-12);
    }

    #[test]
    fn unit_area_with_non_unit_width() {
        let g = BinGeometry::phi_cp();
        let contents: Vec<f64> = (0..g.bins).map(|i| 1.0 + (i % 7) as f64).collect();
        let mut h = Histogram::from_contents("h", g, &contents).unwrap();
        normalize(&mut h);
        let area: f64 = h.contents().iter().map(|c| c * h.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_integral_is_left_unchanged() {
        let mut h = unit_bins(&[0.0, 0.0, 0.0]);
        assert_eq!(normalize(&mut h), NormalizeOutcome::ZeroIntegral);
        assert_eq!(h.contents(), &[0.0, 0.0, 0.0]);
        assert!(!h.is_normalized());
        // Repeating is still a no-op.
        assert_eq!(normalize(&mut h), NormalizeOutcome::ZeroIntegral);
        assert_eq!(h.contents(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn second_normalize_is_guarded() {
        let mut h = unit_bins(&[10.0, 5.0, 10.0]);
        normalize(&mut h);
        let once = h.contents().to_vec();
        assert_eq!(normalize(&mut h), NormalizeOutcome::AlreadyNormalized);
        assert_eq!(h.contents(), once.as_slice());
    }

    #[test]
    fn raw_scaling_twice_is_a_unit_rescale() {
        // After one pass `integral × width == 1`, so a second raw pass
        // multiplies by 1 (up to rounding) instead of double-scaling.
        let g = BinGeometry::new(4, 0.0, 2.0).unwrap();
        let mut h = Histogram::from_contents("h", g, &[3.0, 1.0, 4.0, 1.0]).unwrap();
        scale_by_integral(&mut h);
        let once = h.contents().to_vec();
        match scale_by_integral(&mut h) {
            NormalizeOutcome::Scaled { factor, .. } => assert!((factor - 1.0).abs() < 1e-12),
            other => panic!("unexpected outcome {other:?}"),
        }
        for (a, b) in h.contents().iter().zip(&once) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn normalizes_2d_by_cell_area() {
        let g = BinGeometry::new(2, 0.0, 1.0).unwrap();
        let mut h = Histogram2D::new("h2", g, g);
        h.fill_weighted(0.1, 0.1, 3.0);
        h.fill_weighted(0.9, 0.9, 1.0);
        normalize_2d(&mut h);
        let area = h.integral() * h.bin_area();
        assert!((area - 1.0).abs() < 1e-12);
        assert_eq!(normalize_2d(&mut h), NormalizeOutcome::AlreadyNormalized);
    }
}
