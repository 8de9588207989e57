use std::path::Path;

use phicp_tools::app::pipeline::run_plot;
use phicp_tools::config::Settings;
use phicp_tools::data::{Sample, SampleCatalog, SynthBranch, SynthConfig, generate_table};
use phicp_tools::domain::{BinGeometry, CutSet, FitWeighting, PipelineConfig};
use phicp_tools::error::{EXIT_CONFIG, EXIT_NO_DATA};
use phicp_tools::hist::NormalizeOutcome;
use phicp_tools::io::write_table;

fn catalog() -> SampleCatalog {
    SampleCatalog::new(vec![
        Sample::new("even", "cp-even"),
        Sample::new("odd", "cp-odd"),
        Sample::new("absent", "cp-absent"),
    ])
    .unwrap()
}

fn write_sample(settings: &Settings, sample: &Sample, phase: f64, seed: u64) {
    let mut cfg = SynthConfig::cp_pair(20_000, seed);
    cfg.branches = vec![
        SynthBranch { name: "phiCP_tau_pi".into(), amplitude: 0.4, phase },
        SynthBranch { name: "phiCP_neutrino_pi".into(), amplitude: 0.6, phase },
    ];
    let table = generate_table(&cfg).unwrap();
    let path = settings.table_path(sample);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    write_table(&path, &table).unwrap();
}

fn setup(root: &Path) -> Settings {
    let settings = Settings::default().with_data_root(root);
    let cat = catalog();
    write_sample(&settings, cat.get("even").unwrap(), 0.0, 1);
    write_sample(&settings, cat.get("odd").unwrap(), std::f64::consts::PI, 2);
    settings
}

fn config(out_dir: &Path, samples: &[&str], branches: &[&str]) -> PipelineConfig {
    PipelineConfig {
        samples: samples.iter().map(|s| s.to_string()).collect(),
        branches: branches.iter().map(|s| s.to_string()).collect(),
        y_branch: None,
        cuts: CutSet::parse(&["tau_pt:10:"]).unwrap(),
        geometry: BinGeometry::phi_cp(),
        y_geometry: BinGeometry::phi_cp(),
        weight_column: None,
        fit: true,
        weighting: FitWeighting::Errors,
        output_base: "result".into(),
        out_dir: out_dir.to_path_buf(),
        ascii: false,
        json: true,
        plot_width: 640,
        plot_height: 480,
    }
}

#[test]
fn plot_run_writes_png_report_and_json() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let settings = setup(data.path());
    let cfg = config(out.path(), &["even", "odd"], &["phiCP_tau_pi", "phiCP_neutrino_pi"]);

    let run = run_plot(&cfg, &catalog(), &settings).unwrap();

    assert_eq!(run.series.len(), 4);
    assert_eq!(run.series[0].histogram.name, "phi_CP (cp-even/tau_pi)");
    assert_eq!(run.series[3].histogram.name, "phi_CP (cp-odd/neutrino_pi)");
    for s in &run.series {
        assert!(matches!(s.normalization, NormalizeOutcome::Scaled { .. }));
        let area: f64 = s.histogram.contents().iter().sum::<f64>() * s.histogram.bin_width();
        assert!((area - 1.0).abs() < 1e-9);
    }

    assert_eq!(run.plot_path, out.path().join("result.png"));
    assert!(run.plot_path.exists());
    let report_path = run.report_path.clone().unwrap();
    assert_eq!(report_path, out.path().join("result_fit_results.txt"));
    let report = std::fs::read_to_string(&report_path).unwrap();
    assert_eq!(report.matches("phi_CP (").count(), 4);
    for (s, amplitude) in run.series.iter().zip([0.4, 0.6, 0.4, 0.6]) {
        let fit = s.fit.as_ref().unwrap_or_else(|| panic!("{} was not fitted", s.histogram.name));
        let depth = fit.amplitude.value / fit.offset.value;
        assert!((depth - amplitude).abs() < 0.1, "{}: A/D = {depth}", s.histogram.name);
    }
    for s in &run.series[2..] {
        let phase = s.fit.as_ref().unwrap().phase.value.rem_euclid(std::f64::consts::TAU);
        assert!((phase - std::f64::consts::PI).abs() < 0.3, "{}: C = {phase}", s.histogram.name);
    }
    assert!(run.json_path.as_ref().unwrap().exists());

    // Second run does not overwrite the first.
    let again = run_plot(&cfg, &catalog(), &settings).unwrap();
    assert_eq!(again.plot_path, out.path().join("result_01.png"));
    assert_eq!(
        again.report_path.unwrap(),
        out.path().join("result_01_fit_results.txt")
    );
}

#[test]
fn missing_samples_and_columns_are_skipped() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let settings = setup(data.path());
    let mut cfg = config(out.path(), &["absent", "even"], &["phiCP_tau_pi", "no_such_branch"]);
    cfg.fit = false;

    let run = run_plot(&cfg, &catalog(), &settings).unwrap();
    assert_eq!(run.series.len(), 1);
    assert_eq!(run.skipped.len(), 2);
    assert!(run.report_path.is_none());
    assert!(run.plot_path.exists());
}

#[test]
fn nothing_usable_is_a_no_data_error() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let settings = Settings::default().with_data_root(data.path());
    let cfg = config(out.path(), &["absent"], &["phiCP_tau_pi"]);

    let err = run_plot(&cfg, &catalog(), &settings).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_NO_DATA);
}

#[test]
fn unknown_sample_is_fatal_before_reading() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let settings = setup(data.path());
    let cfg = config(out.path(), &["even", "typo"], &["phiCP_tau_pi"]);

    let err = run_plot(&cfg, &catalog(), &settings).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_CONFIG);
    assert!(!out.path().join("result.png").exists());
}

#[test]
fn two_d_mode_draws_heat_maps_without_report() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let settings = setup(data.path());
    let mut cfg = config(out.path(), &["even", "odd"], &["phiCP_tau_pi"]);
    cfg.y_branch = Some("phiCP_neutrino_pi".into());
    cfg.fit = false;
    cfg.y_geometry = BinGeometry::new(20, 0.0, std::f64::consts::TAU).unwrap();

    let run = run_plot(&cfg, &catalog(), &settings).unwrap();
    assert_eq!(run.maps.len(), 2);
    assert!(run.series.is_empty());
    assert!(run.plot_path.exists());
    assert!(run.report_path.is_none());
    let m = &run.maps[0];
    let area = m.integral() * m.bin_area();
    assert!((area - 1.0).abs() < 1e-9);
}
