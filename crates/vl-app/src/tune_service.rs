//! Gain resolution: tune against the circuit plant or take fixed gains.

use serde::{Deserialize, Serialize};
use tracing::info;
use vl_controls::{ControllerFamily, PidGains};
use vl_project::schema::{Scenario, TuningDef};
use vl_tuning::{MinimizerConfig, TuningMethod, TuningOutcome, tune};

use crate::error::AppResult;
use crate::runtime::ScenarioRuntime;

/// Gains an episode runs with, plus the tuning result when they were tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGains {
    pub gains: PidGains,
    pub outcome: Option<TuningOutcome>,
}

/// Run the scenario's tuning section against `runtime.plant_tf`.
pub fn resolve_gains(scenario: &Scenario, runtime: &ScenarioRuntime) -> AppResult<ResolvedGains> {
    let (method, family, initial, config) = match &scenario.tuning {
        TuningDef::Fixed { gains } => {
            info!(%gains, "using fixed gains");
            return Ok(ResolvedGains {
                gains: *gains,
                outcome: None,
            });
        }
        TuningDef::ZieglerNichols { family } => (
            TuningMethod::ZieglerNichols,
            *family,
            PidGains::default(),
            MinimizerConfig::default(),
        ),
        TuningDef::Optimize {
            method,
            family,
            initial,
            minimizer,
        } => (TuningMethod::Optimize(*method), *family, *initial, *minimizer),
    };

    let outcome = tune_plant(runtime, method, family, initial, &config)?;
    Ok(ResolvedGains {
        gains: outcome.gains,
        outcome: Some(outcome),
    })
}

/// Tune against the runtime's plant with explicit settings, ignoring the
/// scenario's tuning section.
pub fn tune_plant(
    runtime: &ScenarioRuntime,
    method: TuningMethod,
    family: ControllerFamily,
    initial: PidGains,
    config: &MinimizerConfig,
) -> AppResult<TuningOutcome> {
    let outcome = tune(&runtime.plant_tf, method, family, initial, config)?;
    info!(
        patient = %runtime.patient_label,
        %method,
        %family,
        gains = %outcome.gains,
        "tuned controller"
    );
    Ok(outcome)
}
