//! Table inspection: per-branch validity counts, per-sample event counts and
//! row dumps.
//!
//! None of these touch histograms; they exist to check what a sample actually
//! contains before plotting it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::config::Settings;
use crate::data::{Sample, SampleCatalog};
use crate::error::AppError;
use crate::io::{Table, load_table};

/// Valid/total entries of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchCount {
    pub name: String,
    pub valid: usize,
    pub total: usize,
}

impl BranchCount {
    /// Percentage of valid entries (0 for an empty column).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.valid as f64 / self.total as f64
        }
    }
}

/// An entry is valid when it is finite and not the sentinel.
pub fn is_valid(value: f64, sentinel: f64) -> bool {
    value.is_finite() && value != sentinel
}

/// Count valid entries of every column, sorted by column name.
///
/// Columns are independent, so they are scanned in parallel.
pub fn count_valid(table: &Table, sentinel: f64) -> Vec<BranchCount> {
    let names: Vec<&str> = table.schema().names().collect();
    let counts: BTreeMap<String, (usize, usize)> = names
        .par_iter()
        .enumerate()
        .map(|(idx, name)| {
            let values = table.column_at(idx);
            let valid = values.iter().filter(|&&v| is_valid(v, sentinel)).count();
            (name.to_string(), (valid, values.len()))
        })
        .collect();

    counts
        .into_iter()
        .map(|(name, (valid, total))| BranchCount { name, valid, total })
        .collect()
}

/// Validity counts for one sample, or why it could not be scanned.
#[derive(Debug)]
pub struct SampleBranches<'a> {
    pub sample: &'a Sample,
    pub path: PathBuf,
    pub counts: Result<Vec<BranchCount>, AppError>,
}

/// Scan every catalog sample; unreadable tables are reported, not fatal.
pub fn scan_branches<'a>(
    catalog: &'a SampleCatalog,
    settings: &Settings,
    sentinel: f64,
) -> Vec<SampleBranches<'a>> {
    catalog
        .samples()
        .iter()
        .map(|sample| {
            let path = settings.table_path(sample);
            let counts = load_table(&path).map(|t| count_valid(&t, sentinel));
            if let Err(err) = &counts {
                log::warn!("Sample '{}': {err}", sample.label);
            }
            SampleBranches {
                sample,
                path,
                counts,
            }
        })
        .collect()
}

/// Row count of one table file.
#[derive(Debug)]
pub struct FileEvents {
    pub file: String,
    pub rows: Result<usize, AppError>,
}

/// Event counts over all `*.csv` tables of a sample directory.
#[derive(Debug)]
pub struct SampleEvents<'a> {
    pub sample: &'a Sample,
    pub dir: PathBuf,
    pub files: Result<Vec<FileEvents>, AppError>,
}

impl SampleEvents<'_> {
    /// Total rows over the readable files.
    pub fn total(&self) -> usize {
        match &self.files {
            Ok(files) => files.iter().filter_map(|f| f.rows.as_ref().ok()).sum(),
            Err(_) => 0,
        }
    }
}

/// Number of data rows in a CSV file (header excluded).
pub fn count_rows(path: &Path) -> Result<usize, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::config(format!("Failed to open '{}': {e}", path.display())))?;
    let mut n = 0;
    for record in reader.records() {
        record.map_err(|e| AppError::config(format!("Failed to read '{}': {e}", path.display())))?;
        n += 1;
    }
    Ok(n)
}

/// Count rows of every `*.csv` file directly inside `dir`, in name order.
pub fn count_events_in(dir: &Path) -> Result<Vec<FileEvents>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::config(format!("Failed to list '{}': {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    == Some(true)
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|p| FileEvents {
            file: p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rows: count_rows(&p),
        })
        .collect())
}

/// Count events for every catalog sample; missing directories are reported.
pub fn scan_events<'a>(catalog: &'a SampleCatalog, settings: &Settings) -> Vec<SampleEvents<'a>> {
    catalog
        .samples()
        .iter()
        .map(|sample| {
            let dir = settings.sample_dir(sample);
            let files = count_events_in(&dir);
            match &files {
                Err(err) => log::warn!("Sample '{}': {err}", sample.label),
                Ok(files) => {
                    for f in files {
                        if let Err(err) = &f.rows {
                            log::warn!("Sample '{}': {err}", sample.label);
                        }
                    }
                }
            }
            SampleEvents { sample, dir, files }
        })
        .collect()
}

/// First rows of selected columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDump {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Take up to `limit` rows of `columns` (all columns when empty).
pub fn dump_rows(table: &Table, columns: &[String], limit: usize) -> Result<RowDump, AppError> {
    let columns: Vec<String> = if columns.is_empty() {
        table.schema().names().map(str::to_string).collect()
    } else {
        columns.to_vec()
    };
    let data = columns
        .iter()
        .map(|c| table.column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let n = table.n_rows().min(limit);
    let rows = (0..n)
        .map(|r| data.iter().map(|col| col[r]).collect())
        .collect();

    Ok(RowDump { columns, rows })
}
