use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use vl_app::{
    AppError, RunOptions, RunRequest, build_runtime, ensure_run, extract_series, list_runs,
    load_run, run_scenario, summarize, sweep_patients, tracking_summary,
};
use vl_controls::{ControllerFamily, PidGains};
use vl_project::schema::*;
use vl_tuning::{MinimizerConfig, OptimizationMethod};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn fixed_scenario() -> Scenario {
    Scenario {
        version: SCHEMA_VERSION,
        name: "fixed".to_string(),
        lung: LungDef::default(),
        ventilator: VentilatorDef::default(),
        circuit: CircuitDef::default(),
        simulation: SimulationDef {
            max_steps: 600,
            ..SimulationDef::default()
        },
        setpoints: ScheduleDef {
            set_points: vec![5.0, 15.0, 10.0],
            intervals: vec![200, 200, 200],
        },
        controller: ControllerDef::default(),
        tuning: TuningDef::Fixed {
            gains: PidGains::new(0.8, 0.05, 0.0),
        },
    }
}

#[test]
fn runtime_reflects_scenario() {
    let s = fixed_scenario();
    let rt = build_runtime(&s).unwrap();
    assert_eq!(rt.patient_label, "Heated Humidifier, Normal");
    assert_eq!(rt.plant_tf.order(), 2);
    assert_eq!(rt.episode.max_steps, 600);
    assert_eq!(rt.schedule.total_ticks(), 600);
    assert!(rt.new_plant().is_ok());

    let summary = summarize(&s);
    assert_eq!(summary.patient, "hh-normal");
    assert!((summary.duration_s - 20.0).abs() < 1e-12);
}

#[test]
fn run_is_cached_by_content() {
    let dir = unique_temp_dir("vl_app_cache");
    let path = dir.join("fixed.yaml");
    vl_app::save_scenario(&path, &fixed_scenario()).unwrap();

    let request = RunRequest {
        scenario_path: &path,
        options: RunOptions::default(),
    };
    let first = ensure_run(&request).unwrap();
    assert!(!first.loaded_from_cache);
    assert_eq!(first.manifest.steps, 600);
    assert_eq!(first.manifest.gains, PidGains::new(0.8, 0.05, 0.0));
    assert!(first.manifest.tuning.is_none());

    let second = ensure_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.manifest, first.manifest);

    let forced = ensure_run(&RunRequest {
        scenario_path: &path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    })
    .unwrap();
    assert!(!forced.loaded_from_cache);
    assert_eq!(forced.run_id, first.run_id);

    let runs = list_runs(&path, Some("fixed")).unwrap();
    assert_eq!(runs.len(), 1);

    let (manifest, records) = load_run(&path, &first.run_id).unwrap();
    assert_eq!(manifest.run_id, first.run_id);
    assert_eq!(records.len(), 600);
    assert_eq!(extract_series(&records, "setpoint").unwrap()[250].1, 15.0);
    let summary = tracking_summary(&records).unwrap();
    assert_eq!(summary.samples, 600);
    assert!(summary.iae > 0.0);

    assert!(matches!(
        load_run(&path, "missing"),
        Err(AppError::RunNotFound(_))
    ));
}

#[test]
fn optimized_gains_drive_the_episode() {
    let mut s = fixed_scenario();
    s.tuning = TuningDef::Optimize {
        method: OptimizationMethod::NelderMead,
        family: ControllerFamily::PI,
        initial: PidGains::new(1.0, 1.0, 0.0),
        minimizer: MinimizerConfig {
            max_iterations: Some(20),
            ..MinimizerConfig::default()
        },
    };
    let (resolved, record) = run_scenario(&s).unwrap();
    let outcome = resolved.outcome.unwrap();
    let report = outcome.report.unwrap();
    assert!(resolved.gains.is_finite());
    assert_eq!(resolved.gains.kd, 0.0);
    assert!(report.cost <= report.initial_cost);
    assert_eq!(record.len(), 600);
}

#[test]
fn ziegler_nichols_rejects_the_cpap_plant() {
    // the blower and patient lags give a concave step response
    let mut s = fixed_scenario();
    s.tuning = TuningDef::ZieglerNichols {
        family: ControllerFamily::PI,
    };
    assert!(matches!(run_scenario(&s), Err(AppError::Tuning(_))));
}

#[test]
fn sweep_covers_every_preset() {
    let entries = sweep_patients(&fixed_scenario()).unwrap();
    assert_eq!(entries.len(), 10);

    let entries: Vec<_> = entries.into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(entries[0].preset.slug(), "hh-normal");
    assert_eq!(entries[9].preset.slug(), "hme-severe-ards");

    // fixed gains and a volume-controlled lung: the patient preset only
    // changes the tuning plant
    for e in &entries {
        assert_eq!(e.summary, entries[0].summary);
    }
}
