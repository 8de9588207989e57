//! Command-line parsing for the φ_CP histogram tools.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the histogram/fit code.

use std::f64::consts::TAU;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FitWeighting, INVALID_SENTINEL};

pub mod prompt;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "phicp",
    version,
    about = "φ_CP histogram, cosine fit and table inspection tools"
)]
pub struct Cli {
    /// JSON sample catalog replacing the built-in one.
    #[arg(long, global = true, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    /// Override PHICP_DATA_ROOT.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Histogram branches per sample, normalize, fit `A·cos(B·x + C) + D`, write PNG + report.
    Plot(PlotArgs),
    /// Count valid entries (finite, not the sentinel) of every branch per sample.
    Branches(BranchesArgs),
    /// Count events in every table of every sample.
    Events,
    /// Print column names and the first rows of one sample's table.
    Dump(DumpArgs),
    /// Write a synthetic φ_CP table.
    Generate(GenerateArgs),
}

/// Options for the plot pipeline.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Ask for samples, branches, cuts and output name interactively.
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Sample labels (or directory names), comma separated.
    #[arg(short = 's', long, value_delimiter = ',')]
    pub samples: Vec<String>,

    /// Branches to histogram, comma separated.
    #[arg(short = 'b', long, value_delimiter = ',')]
    pub branches: Vec<String>,

    /// Second branch: fill a 2-D histogram per sample and draw heat maps (no fit).
    #[arg(long)]
    pub y_branch: Option<String>,

    /// Range cut on |column|, `name:lo:hi` (either bound may be empty). Repeatable.
    #[arg(long = "cut", value_name = "NAME:LO:HI")]
    pub cuts: Vec<String>,

    /// Number of bins.
    #[arg(long, default_value_t = 50)]
    pub bins: usize,

    /// Lower edge of the first bin.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub lower: f64,

    /// Upper edge of the last bin.
    #[arg(long, default_value_t = TAU, allow_negative_numbers = true)]
    pub upper: f64,

    /// Y-axis bins in 2-D mode.
    #[arg(long, default_value_t = 50)]
    pub y_bins: usize,

    /// Y-axis lower edge in 2-D mode.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub y_lower: f64,

    /// Y-axis upper edge in 2-D mode.
    #[arg(long, default_value_t = TAU, allow_negative_numbers = true)]
    pub y_upper: f64,

    /// Per-row weight column (default: every row counts 1).
    #[arg(long)]
    pub weight: Option<String>,

    /// Skip the cosine fit.
    #[arg(long)]
    pub no_fit: bool,

    /// Bin weighting in the fit.
    #[arg(long, value_enum, default_value_t = FitWeighting::Errors)]
    pub weighting: FitWeighting,

    /// Output base name (`result` → result.png, result_01.png, ...).
    #[arg(short = 'o', long, default_value = "result")]
    pub output: String,

    /// Directory for the PNG and the report.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also print an ASCII preview per histogram.
    #[arg(long)]
    pub ascii: bool,

    /// Also write the fit results as JSON next to the report.
    #[arg(long)]
    pub json: bool,

    /// PNG width (pixels).
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// PNG height (pixels).
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}

/// Options for the branch validity scan.
#[derive(Debug, Args, Clone)]
pub struct BranchesArgs {
    /// Value marking an invalid entry.
    #[arg(long, default_value_t = INVALID_SENTINEL, allow_negative_numbers = true)]
    pub sentinel: f64,
}

/// Options for the table dump.
#[derive(Debug, Args, Clone)]
pub struct DumpArgs {
    /// Sample label or directory name.
    pub sample: String,

    /// Columns to print, comma separated (default: all).
    #[arg(short = 'c', long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Number of rows to print.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub rows: usize,
}

/// Options for synthetic table generation.
#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV", conflicts_with = "sample")]
    pub out: Option<PathBuf>,

    /// Write to this catalog sample's table path under the data root instead.
    #[arg(long)]
    pub sample: Option<String>,

    /// Number of rows.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// φ_CP branch `name[:amplitude[:phase]]`. Repeatable; defaults to a CP-even pair.
    #[arg(long = "branch", value_name = "NAME[:A[:PHASE]]")]
    pub branches: Vec<String>,

    /// Fraction of φ_CP entries replaced by the invalid sentinel.
    #[arg(long, default_value_t = 0.1)]
    pub invalid_fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plot_flags() {
        let cli = Cli::parse_from([
            "phicp",
            "plot",
            "-s",
            "cp-even hadhad,cp-odd hadhad",
            "-b",
            "phiCP_tau_pi",
            "--cut",
            "tau_pt:20:",
            "--cut",
            "tau_eta::2.5",
            "--no-fit",
        ]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.samples, vec!["cp-even hadhad", "cp-odd hadhad"]);
        assert_eq!(args.cuts.len(), 2);
        assert_eq!(args.bins, 50);
        assert_eq!(args.upper, TAU);
        assert!(args.no_fit);
        assert_eq!(args.output, "result");
    }

    #[test]
    fn catalog_flag_is_global() {
        let cli = Cli::parse_from(["phicp", "events", "--catalog", "c.json"]);
        assert_eq!(cli.catalog, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Command::Events));
    }

    #[test]
    fn generate_out_conflicts_with_sample() {
        let res = Cli::try_parse_from(["phicp", "generate", "--out", "a.csv", "--sample", "x"]);
        assert!(res.is_err());
    }
}
