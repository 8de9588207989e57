//! Formatted text output: the fit report artifact and terminal summaries.
//!
//! We keep formatting code in one place so:
//! - the histogram/fit code stays free of presentation details
//! - output changes are localized (the report format is checked byte-for-byte in tests)

use std::fmt::Write as _;

use crate::app::pipeline::PlotRun;
use crate::domain::{FitParam, FitResult};
use crate::hist::NormalizeOutcome;
use crate::inspect::{RowDump, SampleBranches, SampleEvents};
use crate::models::PARAM_NAMES;

/// Deterministic fit report: one block per histogram in the given order.
///
/// ```text
/// phi_CP (cp-even-hadhad/tau_pi)
///   A = 0.012345 ± 0.000678
///   B = ...
///   C = ...
///   D = ...
///   chi2_ndf = 1.023456
/// ```
pub fn format_fit_report(names: &[String], fits: &[Option<FitResult>]) -> String {
    let mut out = String::new();
    for (i, (name, fit)) in names.iter().zip(fits.iter()).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{name}");
        match fit {
            Some(fit) => {
                let params = [fit.amplitude, fit.frequency, fit.phase, fit.offset];
                for (label, p) in PARAM_NAMES.iter().zip(params.iter()) {
                    let _ = writeln!(out, "  {label} = {}", fmt_param(p));
                }
                let _ = writeln!(out, "  chi2_ndf = {:.6}", fit.chi2_ndf);
            }
            None => {
                let _ = writeln!(out, "  fit did not converge");
            }
        }
    }
    out
}

fn fmt_param(p: &FitParam) -> String {
    format!("{:.6} ± {:.6}", p.value, p.error)
}

/// Terminal summary of a plot run.
pub fn format_run_summary(run: &PlotRun) -> String {
    let mut out = String::new();

    out.push_str("=== phicp - φ_CP histograms ===\n");
    for skip in &run.skipped {
        let _ = writeln!(out, "  (skipped {}) {}", skip.what, skip.reason);
    }

    if !run.series.is_empty() {
        out.push_str(
            format!(
                "{:<44} {:>9} {:>10} {:>10}\n",
                "histogram", "entries", "integral", "chi2_ndf"
            )
            .trim_end(),
        );
        out.push('\n');
        out.push_str(format!("{:-<44} {:-<9} {:-<10} {:-<10}\n", "", "", "", "").trim_end());
        out.push('\n');
    }
    for s in &run.series {
        let integral = match s.normalization {
            NormalizeOutcome::Scaled { integral, .. } => format!("{integral:.0}"),
            NormalizeOutcome::ZeroIntegral => "0".to_string(),
            NormalizeOutcome::AlreadyNormalized => "-".to_string(),
        };
        let chi2 = s
            .fit
            .as_ref()
            .map(|f| format!("{:.3}", f.chi2_ndf))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<44} {:>9} {:>10} {:>10}\n",
                truncate(&s.histogram.name, 44),
                s.histogram.entries(),
                integral,
                chi2
            )
            .trim_end(),
        );
        out.push('\n');
    }
    for m in &run.maps {
        let _ = writeln!(
            out,
            "{} entries={} outside={:.0}",
            m.name,
            m.entries(),
            m.outside()
        );
    }

    out.push('\n');
    let _ = writeln!(out, "Plot  : {}", run.plot_path.display());
    if let Some(path) = &run.report_path {
        let _ = writeln!(out, "Report: {}", path.display());
    }
    if let Some(path) = &run.json_path {
        let _ = writeln!(out, "JSON  : {}", path.display());
    }
    out
}

/// `name: valid / total (pct%)` per column, grouped by sample.
pub fn format_branch_counts(scans: &[SampleBranches<'_>]) -> String {
    let mut out = String::new();
    for scan in scans {
        let _ = writeln!(out, "== {} ({})", scan.sample.label, scan.path.display());
        match &scan.counts {
            Ok(counts) => {
                for c in counts {
                    let _ = writeln!(
                        out,
                        "{}: {} / {} ({:.1}%)",
                        c.name,
                        c.valid,
                        c.total,
                        c.percent()
                    );
                }
            }
            Err(err) => {
                let _ = writeln!(out, "  unavailable: {err}");
            }
        }
    }
    out
}

/// Per-file and total event counts, grouped by sample.
pub fn format_event_counts(scans: &[SampleEvents<'_>]) -> String {
    let mut out = String::new();
    for scan in scans {
        let _ = writeln!(out, "== {} ({})", scan.sample.label, scan.dir.display());
        match &scan.files {
            Ok(files) => {
                for f in files {
                    match &f.rows {
                        Ok(n) => {
                            let _ = writeln!(out, "  {}: {n}", f.file);
                        }
                        Err(err) => {
                            let _ = writeln!(out, "  {}: unreadable ({err})", f.file);
                        }
                    }
                }
                let _ = writeln!(
                    out,
                    "  total: {} event(s) in {} file(s)",
                    scan.total(),
                    files.len()
                );
            }
            Err(err) => {
                let _ = writeln!(out, "  unavailable: {err}");
            }
        }
    }
    out
}

/// Column names followed by the dumped rows.
pub fn format_dump(dump: &RowDump) -> String {
    let mut out = String::new();
    let header: Vec<String> = dump
        .columns
        .iter()
        .map(|c| format!("{:>14}", truncate(c, 14)))
        .collect();
    out.push_str(header.join(" ").trim_end());
    out.push('\n');
    for row in &dump.rows {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>14.6}")).collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
