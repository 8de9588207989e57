//! The plot pipeline: load → fill → normalize → fit → report.
//!
//! Keeping this in one place lets the flag-driven and interactive front-ends
//! share the exact same workflow; they differ only in how the
//! `PipelineConfig` is built and how the result is printed.

use std::path::PathBuf;

use crate::config::Settings;
use crate::data::{Sample, SampleCatalog};
use crate::domain::{FitResult, PipelineConfig};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_all};
use crate::hist::{
    Histogram, Histogram2D, NormalizeOutcome, build_histogram, build_histogram_2d, normalize,
    normalize_2d,
};
use crate::io::{Table, load_table, next_free_path, report_path_for, write_fits_json, write_text};

/// One filled histogram and what happened to it downstream.
#[derive(Debug, Clone)]
pub struct SeriesOutput {
    pub sample: String,
    pub branch: String,
    pub histogram: Histogram,
    pub normalization: NormalizeOutcome,
    pub fit: Option<FitResult>,
}

/// An input that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub what: String,
    pub reason: String,
}

/// All outputs of a single `phicp plot` run.
#[derive(Debug, Clone)]
pub struct PlotRun {
    /// 1-D mode: one entry per (sample, branch), in selection order.
    pub series: Vec<SeriesOutput>,
    /// 2-D mode: one map per sample.
    pub maps: Vec<Histogram2D>,
    pub skipped: Vec<Skipped>,
    pub plot_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub json_path: Option<PathBuf>,
}

/// `phi_CP ({sample_dir}/{branch without the phiCP_ prefix})`
pub fn histogram_name(sample_dir: &str, branch: &str) -> String {
    let short = branch.strip_prefix("phiCP_").unwrap_or(branch);
    format!("phi_CP ({sample_dir}/{short})")
}

fn skip(skipped: &mut Vec<Skipped>, what: String, err: &AppError) {
    log::warn!("Skipping {what}: {err}");
    skipped.push(Skipped {
        what,
        reason: err.to_string(),
    });
}

/// Execute the plot pipeline and write its artifacts.
///
/// Unknown samples and bad configuration are fatal before any file is read.
/// Unreadable tables and missing columns skip that input only.
pub fn run_plot(
    config: &PipelineConfig,
    catalog: &SampleCatalog,
    settings: &Settings,
) -> Result<PlotRun, AppError> {
    if config.branches.is_empty() {
        return Err(AppError::config("No branches selected."));
    }
    let samples = catalog.resolve(&config.samples)?;
    if samples.is_empty() {
        return Err(AppError::config("No samples selected."));
    }

    let mut skipped = Vec::new();
    let mut series = Vec::new();
    let mut maps = Vec::new();

    for sample in samples {
        let path = settings.table_path(sample);
        let table = match load_table(&path) {
            Ok(t) => t,
            Err(err) => {
                skip(&mut skipped, format!("sample '{}'", sample.label), &err);
                continue;
            }
        };
        log::info!("Loaded {} row(s) from {}", table.n_rows(), path.display());

        if let Some(y_branch) = &config.y_branch {
            if let Some(map) = fill_map(config, sample, &table, y_branch, &mut skipped) {
                maps.push(map);
            }
        } else {
            series.extend(fill_series(config, sample, &table, &mut skipped));
        }
    }

    if series.is_empty() && maps.is_empty() {
        return Err(AppError::no_data(
            "No histograms could be filled from the selected samples and branches.",
        ));
    }

    std::fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::config(format!(
            "Failed to create output directory '{}': {e}",
            config.out_dir.display()
        ))
    })?;
    let plot_path = next_free_path(&config.out_dir, &config.output_base, "png");
    let size = (config.plot_width, config.plot_height);
    let font = settings.font.as_deref();

    if config.is_2d() {
        crate::plot::render_heatmaps(&plot_path, &maps, size, font)?;
        return Ok(PlotRun {
            series,
            maps,
            skipped,
            plot_path,
            report_path: None,
            json_path: None,
        });
    }

    let hists: Vec<Histogram> = series.iter().map(|s| s.histogram.clone()).collect();
    let fits = if config.fit {
        let opts = FitOptions {
            weighting: config.weighting,
            ..FitOptions::default()
        };
        fit_all(&hists, &opts)
    } else {
        vec![None; hists.len()]
    };
    for (s, fit) in series.iter_mut().zip(fits.iter()) {
        s.fit = fit.clone();
    }

    crate::plot::render_overlay(&plot_path, &hists, &fits, size, font)?;

    let mut report_path = None;
    let mut json_path = None;
    if config.fit {
        let names: Vec<String> = hists.iter().map(|h| h.name.clone()).collect();
        let path = report_path_for(&plot_path);
        write_text(&path, &crate::report::format_fit_report(&names, &fits))?;
        log::info!("Wrote fit report {}", path.display());

        if config.json {
            let jpath = path.with_extension("json");
            write_fits_json(&jpath, &plot_path, &names, &fits)?;
            json_path = Some(jpath);
        }
        report_path = Some(path);
    }

    Ok(PlotRun {
        series,
        maps,
        skipped,
        plot_path,
        report_path,
        json_path,
    })
}

fn fill_series(
    config: &PipelineConfig,
    sample: &Sample,
    table: &Table,
    skipped: &mut Vec<Skipped>,
) -> Vec<SeriesOutput> {
    let mut out = Vec::new();
    for branch in &config.branches {
        let name = histogram_name(&sample.dir, branch);
        let built = build_histogram(
            name.as_str(),
            table,
            branch,
            &config.cuts,
            config.geometry,
            config.weight_column.as_deref(),
        );
        let mut hist = match built {
            Ok(h) => h,
            Err(err) => {
                skip(skipped, format!("'{name}'"), &err);
                continue;
            }
        };
        let normalization = normalize(&mut hist);
        out.push(SeriesOutput {
            sample: sample.label.clone(),
            branch: branch.clone(),
            histogram: hist,
            normalization,
            fit: None,
        });
    }
    out
}

fn fill_map(
    config: &PipelineConfig,
    sample: &Sample,
    table: &Table,
    y_branch: &str,
    skipped: &mut Vec<Skipped>,
) -> Option<Histogram2D> {
    let x_branch = &config.branches[0];
    let name = format!(
        "{} vs {}",
        histogram_name(&sample.dir, x_branch),
        y_branch.strip_prefix("phiCP_").unwrap_or(y_branch)
    );
    let built = build_histogram_2d(
        name.as_str(),
        table,
        x_branch,
        y_branch,
        &config.cuts,
        config.geometry,
        config.y_geometry,
        config.weight_column.as_deref(),
    );
    match built {
        Ok(mut map) => {
            normalize_2d(&mut map);
            Some(map)
        }
        Err(err) => {
            skip(skipped, format!("'{name}'"), &err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_names_drop_branch_prefix() {
        assert_eq!(
            histogram_name("cp-even-hadhad", "phiCP_tau_pi"),
            "phi_CP (cp-even-hadhad/tau_pi)"
        );
        assert_eq!(histogram_name("s", "other"), "phi_CP (s/other)");
    }
}
