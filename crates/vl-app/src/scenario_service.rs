//! Scenario loading, saving, validation and introspection.

use std::path::Path;
use vl_project::schema::{PatientDef, Scenario, TuningDef};

use crate::error::{AppError, AppResult};

/// One-line facts about a scenario for listing.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub name: String,
    pub patient: String,
    pub tuning: String,
    pub segments: usize,
    pub max_steps: usize,
    pub duration_s: f64,
}

/// Load a scenario from a YAML or JSON file. Validation runs on load.
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    Ok(vl_project::load_scenario(path)?)
}

/// Save a scenario as YAML.
pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    validate_scenario(scenario)?;
    let content = serde_yaml::to_string(scenario)
        .map_err(|e| AppError::Scenario(format!("Failed to serialize scenario: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ScenarioFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> AppResult<()> {
    Ok(vl_project::validate_scenario(scenario)?)
}

pub fn summarize(scenario: &Scenario) -> ScenarioSummary {
    let patient = match &scenario.circuit.patient {
        PatientDef::Preset { preset } => preset.clone(),
        PatientDef::Custom { .. } => "custom".to_string(),
    };
    let tuning = match &scenario.tuning {
        TuningDef::ZieglerNichols { family } => format!("ZN {family}"),
        TuningDef::Optimize { method, family, .. } => format!("{method} {family}"),
        TuningDef::Fixed { gains } => format!("fixed {gains}"),
    };
    ScenarioSummary {
        name: scenario.name.clone(),
        patient,
        tuning,
        segments: scenario.setpoints.set_points.len(),
        max_steps: scenario.simulation.max_steps,
        duration_s: scenario.simulation.max_steps as f64 / scenario.simulation.sample_frequency_hz,
    }
}
