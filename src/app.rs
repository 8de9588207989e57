//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads settings/catalog
//! - runs the plot pipeline (from flags or interactive answers)
//! - runs the inspection commands
//! - prints summaries

use clap::Parser;

use crate::cli::{BranchesArgs, Cli, Command, DumpArgs, GenerateArgs, PlotArgs};
use crate::config::Settings;
use crate::data::{SampleCatalog, SynthConfig, generate_table, parse_branch_spec};
use crate::domain::{BinGeometry, CutSet, PipelineConfig};
use crate::error::AppError;

pub mod answers;
pub mod pipeline;

/// Rows/columns of the ASCII preview.
const ASCII_WIDTH: usize = 100;
const ASCII_HEIGHT: usize = 25;

/// Entry point for the `phicp` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(root) = &cli.data_root {
        settings = settings.with_data_root(root);
    }
    let catalog = match &cli.catalog {
        Some(path) => SampleCatalog::from_json_file(path)?,
        None => SampleCatalog::builtin(),
    };

    match cli.command {
        Command::Plot(args) => handle_plot(&args, &catalog, &settings),
        Command::Branches(args) => handle_branches(&args, &catalog, &settings),
        Command::Events => handle_events(&catalog, &settings),
        Command::Dump(args) => handle_dump(&args, &catalog, &settings),
        Command::Generate(args) => handle_generate(&args, &catalog, &settings),
    }
}

fn handle_plot(
    args: &PlotArgs,
    catalog: &SampleCatalog,
    settings: &Settings,
) -> Result<(), AppError> {
    let mut config = plot_config_from_args(args)?;
    if args.interactive {
        let mut prompter = crate::cli::prompt::Prompter::stdio();
        let answers = crate::cli::prompt::ask_plot_answers(&mut prompter, catalog, |sample| {
            let table = crate::io::load_table(&settings.table_path(sample))?;
            Ok(table.schema().names().map(str::to_string).collect())
        })?;
        config = answers::config_from_answers(&answers, config)?;
    } else {
        if config.samples.is_empty() {
            return Err(AppError::config("No samples given. Use --samples or --interactive."));
        }
        if config.branches.is_empty() {
            return Err(AppError::config("No branches given. Use --branches or --interactive."));
        }
    }

    let run = pipeline::run_plot(&config, catalog, settings)?;

    println!("{}", crate::report::format_run_summary(&run));
    if config.ascii {
        for s in &run.series {
            let fit = s.fit.as_ref();
            let ascii =
                crate::plot::render_ascii_plot(&s.histogram, fit, ASCII_WIDTH, ASCII_HEIGHT);
            println!("{ascii}");
        }
    }
    Ok(())
}

/// Build the pipeline configuration from flags alone.
pub fn plot_config_from_args(args: &PlotArgs) -> Result<PipelineConfig, AppError> {
    let y_branch = args.y_branch.clone();
    if y_branch.is_some() && args.branches.len() > 1 {
        return Err(AppError::config(
            "2-D mode takes exactly one --branches entry (the x axis).",
        ));
    }
    Ok(PipelineConfig {
        samples: args.samples.clone(),
        branches: args.branches.clone(),
        fit: !args.no_fit && y_branch.is_none(),
        y_branch,
        cuts: CutSet::parse(&args.cuts)?,
        geometry: BinGeometry::new(args.bins, args.lower, args.upper)?,
        y_geometry: BinGeometry::new(args.y_bins, args.y_lower, args.y_upper)?,
        weight_column: args.weight.clone(),
        weighting: args.weighting,
        output_base: answers::clean_output_base(&args.output)?,
        out_dir: args.out_dir.clone(),
        ascii: args.ascii,
        json: args.json,
        plot_width: args.width,
        plot_height: args.height,
    })
}

fn handle_branches(
    args: &BranchesArgs,
    catalog: &SampleCatalog,
    settings: &Settings,
) -> Result<(), AppError> {
    let scans = crate::inspect::scan_branches(catalog, settings, args.sentinel);
    print!("{}", crate::report::format_branch_counts(&scans));
    if scans.iter().all(|s| s.counts.is_err()) {
        return Err(AppError::no_data("No sample table could be read."));
    }
    Ok(())
}

fn handle_events(catalog: &SampleCatalog, settings: &Settings) -> Result<(), AppError> {
    let scans = crate::inspect::scan_events(catalog, settings);
    print!("{}", crate::report::format_event_counts(&scans));
    if scans.iter().all(|s| s.files.is_err()) {
        return Err(AppError::no_data("No sample directory could be read."));
    }
    Ok(())
}

fn handle_dump(
    args: &DumpArgs,
    catalog: &SampleCatalog,
    settings: &Settings,
) -> Result<(), AppError> {
    let sample = catalog.get(&args.sample)?;
    let path = settings.table_path(sample);
    let table = crate::io::load_table(&path)?;

    println!("{} ({} rows)", path.display(), table.n_rows());
    let columns: Vec<String> = table
        .schema()
        .columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.kind.label()))
        .collect();
    println!("columns: {}", columns.join(", "));
    println!();

    let dump = crate::inspect::dump_rows(&table, &args.columns, args.rows)?;
    print!("{}", crate::report::format_dump(&dump));
    Ok(())
}

fn handle_generate(
    args: &GenerateArgs,
    catalog: &SampleCatalog,
    settings: &Settings,
) -> Result<(), AppError> {
    let path = match (&args.out, &args.sample) {
        (Some(out), _) => out.clone(),
        (None, Some(label)) => settings.table_path(catalog.get(label)?),
        (None, None) => return Err(AppError::config("Pass --out <csv> or --sample <label>.")),
    };

    let mut config = SynthConfig::cp_pair(args.rows, args.seed);
    config.invalid_fraction = args.invalid_fraction;
    if !args.branches.is_empty() {
        config.branches = args
            .branches
            .iter()
            .map(|s| parse_branch_spec(s))
            .collect::<Result<_, _>>()?;
    }

    let table = generate_table(&config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::config(format!("Failed to create '{}': {e}", parent.display()))
        })?;
    }
    crate::io::write_table(&path, &table)?;
    println!("Wrote {} row(s) to {}", table.n_rows(), path.display());
    Ok(())
}
