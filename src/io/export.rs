//! Output artifacts: collision-free file names, the text fit report and the
//! optional JSON fit dump.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::FitResult;
use crate::error::AppError;

/// Suffix appended to the plot stem for the text report.
pub const REPORT_SUFFIX: &str = "_fit_results.txt";

/// First free path among `base.ext`, `base_01.ext`, `base_02.ext`, ...
///
/// The check is advisory: another process may create the file in between.
pub fn next_free_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{base}.{ext}"));
    if !first.exists() {
        return first;
    }
    let mut n: u32 = 1;
    loop {
        let candidate = dir.join(format!("{base}_{n:02}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// `<dir>/<stem>_fit_results.txt` next to the chosen plot.
pub fn report_path_for(plot: &Path) -> PathBuf {
    let stem = plot
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("result");
    plot.with_file_name(format!("{stem}{REPORT_SUFFIX}"))
}

/// Write a text artifact, replacing any previous content.
pub fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::internal(format!("Failed to create '{}': {e}", path.display())))?;
    file.write_all(text.as_bytes())
        .map_err(|e| AppError::internal(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

#[derive(Serialize)]
struct FitDump<'a> {
    plot: String,
    fits: Vec<FitDumpEntry<'a>>,
}

#[derive(Serialize)]
struct FitDumpEntry<'a> {
    histogram: &'a str,
    converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a FitResult>,
}

/// Dump fit results as pretty JSON, keeping one entry per histogram in order.
pub fn write_fits_json(
    path: &Path,
    plot: &Path,
    names: &[String],
    fits: &[Option<FitResult>],
) -> Result<(), AppError> {
    let dump = FitDump {
        plot: plot.display().to_string(),
        fits: names
            .iter()
            .zip(fits.iter())
            .map(|(name, fit)| FitDumpEntry {
                histogram: name,
                converged: fit.is_some(),
                result: fit.as_ref(),
            })
            .collect(),
    };

    let file = File::create(path)
        .map_err(|e| AppError::internal(format!("Failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &dump)
        .map_err(|e| AppError::internal(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let p0 = next_free_path(dir.path(), "result", "png");
        assert_eq!(p0, dir.path().join("result.png"));

        std::fs::write(&p0, b"x").unwrap();
        let p1 = next_free_path(dir.path(), "result", "png");
        assert_eq!(p1, dir.path().join("result_01.png"));

        std::fs::write(&p1, b"x").unwrap();
        let p2 = next_free_path(dir.path(), "result", "png");
        assert_eq!(p2, dir.path().join("result_02.png"));
    }

    #[test]
    fn report_path_uses_plot_stem() {
        assert_eq!(
            report_path_for(Path::new("/tmp/out/result_01.png")),
            PathBuf::from("/tmp/out/result_01_fit_results.txt")
        );
    }

    #[test]
    fn json_dump_keeps_failed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fits.json");
        let names = vec!["a".to_string(), "b".to_string()];
        write_fits_json(&path, Path::new("result.png"), &names, &[None, None]).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["fits"].as_array().unwrap().len(), 2);
        assert_eq!(v["fits"][1]["converged"], false);
    }
}
