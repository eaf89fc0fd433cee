//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};
use vl_project::schema::Scenario;
use vl_results::{RunManifest, RunStore, TimeseriesRecord, compute_run_id, timestamp_now};
use vl_sim::{EpisodeRecord, PatientPreset, run_batch, run_episode};

use crate::error::AppResult;
use crate::query::{TrackingSummary, tracking_summary};
use crate::runtime::{ScenarioRuntime, build_runtime};
use crate::scenario_service;
use crate::tune_service::{ResolvedGains, resolve_gains};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for running scenarios.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub engine_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            engine_version: ENGINE_VERSION.to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub scenario_path: &'a Path,
    pub options: RunOptions,
}

/// Wall-clock breakdown of a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub tune_time_s: f64,
    pub simulate_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

/// Execute or load a run of the scenario at `request.scenario_path`.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    let scenario = scenario_service::load_scenario(request.scenario_path)?;
    let run_id = compute_run_id(&scenario, &request.options.engine_version);
    let store = RunStore::for_scenario(request.scenario_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        let load_started = Instant::now();
        match store.load_manifest(&run_id) {
            Ok(manifest) => {
                timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
                timing.total_time_s = started.elapsed().as_secs_f64();
                info!(%run_id, "loaded cached run");
                return Ok(RunResponse {
                    run_id,
                    manifest,
                    loaded_from_cache: true,
                    timing,
                });
            }
            Err(e) => warn!(%run_id, error = %e, "unreadable cached run, re-running"),
        }
    }

    let runtime = build_runtime(&scenario)?;

    let tune_started = Instant::now();
    let resolved = resolve_gains(&scenario, &runtime)?;
    timing.tune_time_s = tune_started.elapsed().as_secs_f64();

    let sim_started = Instant::now();
    let record = simulate(&runtime, &resolved)?;
    timing.simulate_time_s = sim_started.elapsed().as_secs_f64();

    let manifest = RunManifest {
        run_id: run_id.clone(),
        scenario_name: scenario.name.clone(),
        timestamp: timestamp_now(),
        engine_version: request.options.engine_version.clone(),
        patient: runtime.patient_label.clone(),
        sample_frequency_hz: runtime.plant_config.sample_frequency,
        steps: record.len(),
        gains: resolved.gains,
        tuning: resolved.outcome,
    };

    let save_started = Instant::now();
    store.save_run(&manifest, &record.samples)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    info!(%run_id, steps = manifest.steps, "run saved");
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

/// One closed-loop episode with fresh plant and controller.
pub fn simulate(runtime: &ScenarioRuntime, resolved: &ResolvedGains) -> AppResult<EpisodeRecord> {
    let mut plant = runtime.new_plant()?;
    let mut controller = runtime.new_controller(resolved.gains)?;
    Ok(run_episode(
        &mut plant,
        controller.as_mut(),
        &runtime.schedule,
        &runtime.episode,
    )?)
}

/// Tune and simulate in memory without touching the run store.
pub fn run_scenario(scenario: &Scenario) -> AppResult<(ResolvedGains, EpisodeRecord)> {
    let runtime = build_runtime(scenario)?;
    let resolved = resolve_gains(scenario, &runtime)?;
    let record = simulate(&runtime, &resolved)?;
    Ok((resolved, record))
}

/// Result of one patient in a sweep.
#[derive(Debug, Clone)]
pub struct PatientSweepEntry {
    pub preset: PatientPreset,
    pub gains: ResolvedGains,
    pub summary: TrackingSummary,
}

/// Re-tune and re-run the scenario for every patient preset, in parallel.
///
/// Presets whose tuning or episode fails are returned as errors in place.
pub fn sweep_patients(scenario: &Scenario) -> AppResult<Vec<AppResult<PatientSweepEntry>>> {
    let base = build_runtime(scenario)?;

    let results = run_batch(PatientPreset::ALL.to_vec(), |preset| -> AppResult<PatientSweepEntry> {
        let runtime = base.with_patient(preset)?;
        let gains = resolve_gains(scenario, &runtime)?;
        let record = simulate(&runtime, &gains)?;
        Ok(PatientSweepEntry {
            preset,
            summary: tracking_summary(&record.samples)?,
            gains,
        })
    });

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(failed, total = results.len(), "patient sweep had failures");
    }
    Ok(results)
}

/// Runs stored next to a scenario, most recent first.
pub fn list_runs(scenario_path: &Path, scenario_name: Option<&str>) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_scenario(scenario_path)?;

    let mut runs = store.list_runs(scenario_name)?;
    runs.reverse();
    Ok(runs)
}

/// Load a specific run.
pub fn load_run(
    scenario_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let store = RunStore::for_scenario(scenario_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;

    Ok((manifest, records))
}
