use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vl_app::{
    AppResult, ResolvedGains, RunOptions, RunRequest, query, run_service, runtime,
    scenario_service, tune_service,
};
use vl_controls::{ControllerFamily, PidGains};
use vl_project::schema::TuningDef;
use vl_sim::PatientPreset;
use vl_tuning::{MinimizerConfig, TuningMethod};

#[derive(Parser)]
#[command(name = "vl-cli")]
#[command(about = "Ventiloop CLI - PID tuning and closed-loop simulation for CPAP pressure control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario file syntax and values
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Tune the controller against the scenario's CPAP plant
    Tune {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Tuning method: ZN, Nelder-Mead or BFGS (defaults to the scenario's)
        #[arg(long)]
        method: Option<TuningMethod>,
        /// Controller family: P, PI or PID (defaults to the scenario's)
        #[arg(long)]
        family: Option<ControllerFamily>,
        /// Patient preset, e.g. hh-normal or hme-severe-ards
        #[arg(long)]
        patient: Option<PatientPreset>,
    },
    /// Tune and run a closed-loop episode
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs next to a scenario
    Runs {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Only runs of this scenario name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one variable of a run as CSV
    ExportSeries {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Run ID
        run_id: String,
        /// flow, volume, pressure, setpoint, error, accumulated_error or action
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-tune and run the scenario for every patient preset
    SweepPatients {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Tune {
            scenario_path,
            method,
            family,
            patient,
        } => cmd_tune(&scenario_path, method, family, patient),
        Commands::Run {
            scenario_path,
            no_cache,
        } => cmd_run(&scenario_path, !no_cache),
        Commands::Runs {
            scenario_path,
            name,
        } => cmd_runs(&scenario_path, name.as_deref()),
        Commands::ShowRun {
            scenario_path,
            run_id,
        } => cmd_show_run(&scenario_path, &run_id),
        Commands::ExportSeries {
            scenario_path,
            run_id,
            variable,
            output,
        } => cmd_export_series(&scenario_path, &run_id, &variable, output.as_deref()),
        Commands::SweepPatients { scenario_path } => cmd_sweep_patients(&scenario_path),
    }
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = scenario_service::load_scenario(scenario_path)?;
    let summary = scenario_service::summarize(&scenario);
    println!("✓ Scenario is valid");
    println!("  Name: {}", summary.name);
    println!("  Patient: {}", summary.patient);
    println!("  Tuning: {}", summary.tuning);
    println!(
        "  Schedule: {} segments, {} steps ({:.1} s)",
        summary.segments, summary.max_steps, summary.duration_s
    );
    Ok(())
}

fn cmd_tune(
    scenario_path: &Path,
    method: Option<TuningMethod>,
    family: Option<ControllerFamily>,
    patient: Option<PatientPreset>,
) -> AppResult<()> {
    let scenario = scenario_service::load_scenario(scenario_path)?;
    let mut rt = runtime::build_runtime(&scenario)?;
    if let Some(preset) = patient {
        rt = rt.with_patient(preset)?;
    }

    println!("Patient: {}", rt.patient_label);
    println!("Plant: {}", rt.plant_tf);

    let resolved = if method.is_none() && family.is_none() {
        tune_service::resolve_gains(&scenario, &rt)?
    } else {
        let (default_method, default_family, initial, config) = match &scenario.tuning {
            TuningDef::Optimize {
                method,
                family,
                initial,
                minimizer,
            } => (TuningMethod::Optimize(*method), *family, *initial, *minimizer),
            TuningDef::ZieglerNichols { family } => (
                TuningMethod::ZieglerNichols,
                *family,
                PidGains::new(1.0, 1.0, 0.0),
                MinimizerConfig::default(),
            ),
            TuningDef::Fixed { gains } => (
                TuningMethod::default(),
                ControllerFamily::default(),
                *gains,
                MinimizerConfig::default(),
            ),
        };
        let outcome = tune_service::tune_plant(
            &rt,
            method.unwrap_or(default_method),
            family.unwrap_or(default_family),
            initial,
            &config,
        )?;
        ResolvedGains {
            gains: outcome.gains,
            outcome: Some(outcome),
        }
    };

    print_gains(&resolved);
    Ok(())
}

fn print_gains(resolved: &ResolvedGains) {
    let Some(outcome) = &resolved.outcome else {
        println!("✓ Fixed gains: {}", resolved.gains);
        return;
    };

    println!("✓ {} {} gains: {}", outcome.method, outcome.family, outcome.gains);
    if let Some(rc) = &outcome.reaction_curve {
        println!("  Inflection: t = {:.4} s, y = {:.4}", rc.inflection_time, rc.inflection_value);
        println!("  Dead time L: {:.4} s", rc.dead_time);
        println!("  Time constant T: {:.4} s", rc.time_constant);
    }
    if let Some(report) = &outcome.report {
        println!("  Cost: {:.4} (from {:.4})", report.cost, report.initial_cost);
        println!(
            "  Iterations: {}, evaluations: {}",
            report.iterations, report.evaluations
        );
        println!("  Status: {}", report.status);
    }
}

fn cmd_run(scenario_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running scenario: {}", scenario_path.display());

    let request = RunRequest {
        scenario_path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };
    let response = run_service::ensure_run(&request)?;

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }

    let t = &response.timing;
    println!("\nTiming summary:");
    if response.loaded_from_cache {
        println!("  Cache load: {:.3}s", t.load_cache_time_s);
    } else {
        println!("  Tune:     {:.3}s", t.tune_time_s);
        println!("  Simulate: {:.3}s", t.simulate_time_s);
        println!("  Save:     {:.3}s", t.save_time_s);
    }
    println!("  Total:    {:.3}s", t.total_time_s);

    println!("\nGains: {}", response.manifest.gains);
    let (_manifest, records) = run_service::load_run(scenario_path, &response.run_id)?;
    print_tracking(&query::tracking_summary(&records)?);

    Ok(())
}

fn print_tracking(summary: &query::TrackingSummary) {
    println!("  Samples: {}", summary.samples);
    println!(
        "  Time range: {:.3} - {:.3} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  IAE: {:.4}", summary.iae);
    println!("  RMS error: {:.4}", summary.rms_error);
    println!("  Max |error|: {:.4}", summary.max_abs_error);
    println!("  Mean pressure: {:.4} cmH2O", summary.mean_pressure);
}

fn cmd_runs(scenario_path: &Path, name: Option<&str>) -> AppResult<()> {
    let runs = run_service::list_runs(scenario_path, name)?;

    if runs.is_empty() {
        println!("No cached runs found next to {}", scenario_path.display());
    } else {
        println!("Cached runs:");
        for manifest in runs {
            println!(
                "  {} ({}) {} [{}]",
                manifest.run_id, manifest.timestamp, manifest.scenario_name, manifest.patient
            );
        }
    }
    Ok(())
}

fn cmd_show_run(scenario_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(scenario_path, run_id)?;

    println!("\nRun:");
    println!("  Scenario: {}", manifest.scenario_name);
    println!("  Patient: {}", manifest.patient);
    println!("  Timestamp: {}", manifest.timestamp);
    println!("  Engine: {}", manifest.engine_version);
    println!("  Sample frequency: {} Hz", manifest.sample_frequency_hz);
    println!("  Gains: {}", manifest.gains);
    if let Some(outcome) = &manifest.tuning {
        println!("  Tuned with: {} {}", outcome.method, outcome.family);
    }

    println!("\nTracking:");
    print_tracking(&query::tracking_summary(&records)?);

    println!("\nVariables:");
    for v in query::SERIES_VARIABLES {
        println!("  {}", v);
    }
    Ok(())
}

fn cmd_export_series(
    scenario_path: &Path,
    run_id: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(scenario_path, run_id)?;
    let series = query::extract_series(&records, variable)?;

    let mut csv = format!("time_s,{}\n", variable);
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}

fn cmd_sweep_patients(scenario_path: &Path) -> AppResult<()> {
    let scenario = scenario_service::load_scenario(scenario_path)?;
    println!("Sweeping patient presets for: {}", scenario.name);

    let entries = run_service::sweep_patients(&scenario)?;
    println!(
        "\n{:<36} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "patient", "kp", "ki", "kd", "IAE", "RMS"
    );
    for (preset, entry) in PatientPreset::ALL.iter().zip(entries) {
        match entry {
            Ok(e) => println!(
                "{:<36} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                preset.to_string(),
                e.gains.gains.kp,
                e.gains.gains.ki,
                e.gains.gains.kd,
                e.summary.iae,
                e.summary.rms_error
            ),
            Err(err) => println!("{:<36} failed: {}", preset.to_string(), err),
        }
    }
    Ok(())
}
