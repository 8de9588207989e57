//! PNG rendering with plotters.
//!
//! Text (caption, tick labels, legend) needs a registered font. We look for
//! one at `PHICP_FONT` or a few common system locations; without a font the
//! plot is still drawn, just without any text.

use std::path::Path;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::FontStyle;

use crate::domain::FitResult;
use crate::error::AppError;
use crate::hist::{Histogram, Histogram2D};
use crate::models::sample_curve;

/// Font family name our registered font is stored under.
pub const FONT_FAMILY: &str = "sans-serif";

const SYSTEM_FONTS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Series colours in assignment order; indices wrap around.
pub const PALETTE: [RGBColor; 10] = [
    BLUE,
    BLACK,
    RED,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 165, 0),
    RGBColor(143, 0, 255),
    RGBColor(255, 105, 180),
    RGBColor(128, 128, 128),
];

pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Register a font for plot text once per process. Returns whether text can be drawn.
pub fn ensure_font(preferred: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = preferred
            .into_iter()
            .map(Path::to_path_buf)
            .chain(SYSTEM_FONTS.iter().map(|p| Path::new(p).to_path_buf()));
        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                log::debug!("Plot font: {}", path.display());
                return true;
            }
        }
        log::warn!("No usable font found (set PHICP_FONT); plots will have no text.");
        false
    })
}

/// Y-axis range `[0.95·min, 1.05·max]` over all bin contents.
pub fn y_range(hists: &[Histogram]) -> Option<(f64, f64)> {
    let min = hists.iter().map(Histogram::min_content).fold(f64::INFINITY, f64::min);
    let max = hists
        .iter()
        .map(Histogram::max_content)
        .fold(f64::NEG_INFINITY, f64::max);
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    let (lo, hi) = (0.95 * min, 1.05 * max);
    if hi > lo { Some((lo, hi)) } else { Some((lo - 1.0, lo + 1.0)) }
}

fn draw_err<E: std::fmt::Display>(err: E) -> AppError {
    AppError::internal(format!("Plot rendering failed: {err}"))
}

/// Overlay step histograms and their fitted curves in one image.
///
/// `fits[i]` belongs to `hists[i]`; missing fits simply draw no curve.
pub fn render_overlay(
    path: &Path,
    hists: &[Histogram],
    fits: &[Option<FitResult>],
    size: (u32, u32),
    font: Option<&Path>,
) -> Result<(), AppError> {
    let (y_lo, y_hi) =
        y_range(hists).ok_or_else(|| AppError::no_data("No histograms to plot."))?;
    let x_lo = hists
        .iter()
        .map(|h| h.geometry().lower)
        .fold(f64::INFINITY, f64::min);
    let x_hi = hists
        .iter()
        .map(|h| h.geometry().upper)
        .fold(f64::NEG_INFINITY, f64::max);
    let text = ensure_font(font);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder
            .caption("φ_CP", (FONT_FAMILY, 28))
            .x_label_area_size(50)
            .y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;

    if text {
        chart
            .configure_mesh()
            .x_desc("φ_CP [rad]")
            .y_desc("normalized entries")
            .label_style((FONT_FAMILY, 14))
            .draw()
            .map_err(draw_err)?;
    } else {
        chart
            .configure_mesh()
            .x_labels(0)
            .y_labels(0)
            .draw()
            .map_err(draw_err)?;
    }

    for (i, hist) in hists.iter().enumerate() {
        let color = series_color(i);
        chart
            .draw_series(LineSeries::new(hist.step_points(), color.stroke_width(2)))
            .map_err(draw_err)?
            .label(hist.name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 25, y)], color.stroke_width(2))
            });

        if let Some(Some(fit)) = fits.get(i) {
            let g = hist.geometry();
            let curve = sample_curve(&fit.params(), g.lower, g.upper, 400);
            chart
                .draw_series(LineSeries::new(curve, &color))
                .map_err(draw_err)?;
        }
    }

    if text {
        chart
            .configure_series_labels()
            .label_font((FONT_FAMILY, 14))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    log::info!("Wrote plot {}", path.display());
    Ok(())
}

/// Three-stop gradient (dark purple → teal → yellow) for `t ∈ [0, 1]`.
pub fn heat_color(t: f64) -> RGBColor {
    const STOPS: [(f64, f64, f64); 3] = [
        (68.0, 1.0, 84.0),
        (33.0, 145.0, 140.0),
        (253.0, 231.0, 37.0),
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let (a, b, u) = if t < 0.5 {
        (STOPS[0], STOPS[1], t * 2.0)
    } else {
        (STOPS[1], STOPS[2], (t - 0.5) * 2.0)
    };
    let mix = |x: f64, y: f64| (x + (y - x) * u).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Heat maps of 2-D histograms, side by side in one image.
pub fn render_heatmaps(
    path: &Path,
    maps: &[Histogram2D],
    size: (u32, u32),
    font: Option<&Path>,
) -> Result<(), AppError> {
    if maps.is_empty() {
        return Err(AppError::no_data("No 2-D histograms to plot."));
    }
    let text = ensure_font(font);

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let panels = root.split_evenly((1, maps.len()));

    for (map, panel) in maps.iter().zip(panels.iter()) {
        let xg = *map.x_geometry();
        let yg = *map.y_geometry();
        let max = map.max_content();

        let mut builder = ChartBuilder::on(panel);
        builder.margin(15);
        if text {
            builder
                .caption(&map.name, (FONT_FAMILY, 16))
                .x_label_area_size(40)
                .y_label_area_size(50);
        }
        let mut chart = builder
            .build_cartesian_2d(xg.lower..xg.upper, yg.lower..yg.upper)
            .map_err(draw_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh();
        if text {
            mesh.label_style((FONT_FAMILY, 12));
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw().map_err(draw_err)?;

        let cells = (0..xg.bins).flat_map(|ix| (0..yg.bins).map(move |iy| (ix, iy)));
        chart
            .draw_series(cells.map(|(ix, iy)| {
                let t = if max > 0.0 { map.content(ix, iy) / max } else { 0.0 };
                Rectangle::new(
                    [(xg.edge(ix), yg.edge(iy)), (xg.edge(ix + 1), yg.edge(iy + 1))],
                    heat_color(t).filled(),
                )
            }))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    log::info!("Wrote heat map {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BinGeometry;

    #[test]
    fn palette_cycles_in_order() {
        assert_eq!(series_color(0), BLUE);
        assert_eq!(series_color(1), BLACK);
        assert_eq!(series_color(10), BLUE);
        assert_eq!(series_color(12), RED);
    }

    #[test]
    fn y_range_pads_global_extrema() {
        let g = BinGeometry::new(2, 0.0, 1.0).unwrap();
        let a = Histogram::from_contents("a", g, &[2.0, 4.0]).unwrap();
        let b = Histogram::from_contents("b", g, &[1.0, 10.0]).unwrap();
        let (lo, hi) = y_range(&[a, b]).unwrap();
        assert!((lo - 0.95).abs() < 1e-12);
        assert!((hi - 10.5).abs() < 1e-12);
        assert!(y_range(&[]).is_none());
    }

    #[test]
    fn heat_color_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(68, 1, 84));
        assert_eq!(heat_color(1.0), RGBColor(253, 231, 37));
        assert_eq!(heat_color(f64::NAN), RGBColor(68, 1, 84));
    }

    #[test]
    fn renders_overlay_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.png");
        let g = BinGeometry::phi_cp();
        let contents: Vec<f64> = (0..g.bins).map(|i| 10.0 + g.center(i).cos()).collect();
        let h = Histogram::from_contents("h", g, &contents).unwrap();
        render_overlay(&path, &[h], &[None], (320, 240), None).unwrap();
        assert!(path.exists());
    }
}
