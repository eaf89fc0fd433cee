//! Shared application service layer for ventiloop.
//!
//! Front-ends go through this crate to load scenarios, build runtime objects,
//! tune controllers, run and cache episodes, and query stored results.

pub mod error;
pub mod query;
pub mod run_service;
pub mod runtime;
pub mod scenario_service;
pub mod tune_service;

pub use error::{AppError, AppResult};
pub use query::{SERIES_VARIABLES, TrackingSummary, extract_series, tracking_summary};
pub use run_service::{
    ENGINE_VERSION, PatientSweepEntry, RunOptions, RunRequest, RunResponse, RunTimingSummary,
    ensure_run, list_runs, load_run, run_scenario, simulate, sweep_patients,
};
pub use runtime::{ScenarioRuntime, build_runtime};
pub use scenario_service::{
    ScenarioSummary, load_scenario, save_scenario, summarize, validate_scenario,
};
pub use tune_service::{ResolvedGains, resolve_gains, tune_plant};
