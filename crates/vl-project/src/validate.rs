//! Scenario validation logic.

use vl_controls::PidGains;
use vl_sim::PatientPreset;

use crate::schema::{
    CircuitDef, ControllerDef, PatientDef, SCHEMA_VERSION, Scenario, ScheduleDef, SimulationDef,
    TuningDef, VentilatorDef,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version != SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "must not be empty"));
    }

    positive("lung.airway_resistance", scenario.lung.airway_resistance)?;
    positive("lung.compliance", scenario.lung.compliance)?;
    validate_ventilator(&scenario.ventilator)?;
    validate_circuit(&scenario.circuit)?;
    validate_simulation(&scenario.simulation)?;
    validate_schedule(&scenario.setpoints)?;
    validate_controller(&scenario.controller)?;
    validate_tuning(&scenario.tuning)?;
    Ok(())
}

fn validate_ventilator(v: &VentilatorDef) -> Result<(), ValidationError> {
    positive("ventilator.tidal_volume_ml", v.tidal_volume_ml)?;
    finite("ventilator.peep_cmh2o", v.peep_cmh2o)?;
    positive("ventilator.respiratory_rate_per_min", v.respiratory_rate_per_min)?;
    positive("ventilator.inspiratory_time_s", v.inspiratory_time_s)?;
    non_negative("ventilator.pause_time_s", v.pause_time_s)?;

    let expiratory = 60.0 / v.respiratory_rate_per_min - v.inspiratory_time_s - v.pause_time_s;
    if expiratory <= 0.0 {
        return Err(invalid(
            "ventilator expiratory time",
            expiratory,
            "breath period must exceed inspiratory plus pause time",
        ));
    }
    Ok(())
}

fn validate_circuit(circuit: &CircuitDef) -> Result<(), ValidationError> {
    match &circuit.patient {
        PatientDef::Preset { preset } => {
            if preset.parse::<PatientPreset>().is_err() {
                return Err(ValidationError::MissingReference {
                    id: preset.clone(),
                    context: "circuit.patient.preset".to_string(),
                });
            }
        }
        PatientDef::Custom { rp, c, rl } => {
            positive("circuit.patient.rp", *rp)?;
            positive("circuit.patient.c", *c)?;
            positive("circuit.patient.rl", *rl)?;
        }
    }
    positive("circuit.blower.time_constant_s", circuit.blower.time_constant_s)?;
    finite("circuit.blower.gain", circuit.blower.gain)?;
    Ok(())
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    positive("simulation.sample_frequency_hz", sim.sample_frequency_hz)?;
    if sim.max_steps == 0 {
        return Err(invalid("simulation.max_steps", 0, "must be positive"));
    }
    finite("simulation.initial_volume_ml", sim.initial_volume_ml)?;
    if let Some(p) = sim.initial_pressure_cmh2o {
        finite("simulation.initial_pressure_cmh2o", p)?;
    }
    Ok(())
}

fn validate_schedule(schedule: &ScheduleDef) -> Result<(), ValidationError> {
    if schedule.set_points.is_empty() {
        return Err(invalid("setpoints.set_points", "[]", "must not be empty"));
    }
    if schedule.set_points.len() != schedule.intervals.len() {
        return Err(invalid(
            "setpoints.intervals",
            schedule.intervals.len(),
            &format!("expected one interval per set point ({})", schedule.set_points.len()),
        ));
    }
    for (k, v) in schedule.set_points.iter().enumerate() {
        finite(&format!("setpoints.set_points[{k}]"), *v)?;
    }
    if let Some(k) = schedule.intervals.iter().position(|n| *n == 0) {
        return Err(invalid(
            &format!("setpoints.intervals[{k}]"),
            0,
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_controller(c: &ControllerDef) -> Result<(), ValidationError> {
    finite("controller.integrator_min", c.integrator_min)?;
    finite("controller.integrator_max", c.integrator_max)?;
    if c.integrator_min > c.integrator_max {
        return Err(invalid(
            "controller.integrator_min",
            c.integrator_min,
            "must not exceed integrator_max",
        ));
    }
    positive("controller.dt", c.dt)?;
    Ok(())
}

fn validate_tuning(t: &TuningDef) -> Result<(), ValidationError> {
    match t {
        TuningDef::ZieglerNichols { .. } => Ok(()),
        TuningDef::Optimize {
            initial, minimizer, ..
        } => {
            gains("tuning.initial", initial)?;
            positive("tuning.minimizer.xatol", minimizer.xatol)?;
            positive("tuning.minimizer.fatol", minimizer.fatol)?;
            positive("tuning.minimizer.gtol", minimizer.gtol)?;
            positive("tuning.minimizer.gradient_step", minimizer.gradient_step)?;
            Ok(())
        }
        TuningDef::Fixed { gains: g } => gains("tuning.gains", g),
    }
}

fn gains(field: &str, g: &PidGains) -> Result<(), ValidationError> {
    finite(&format!("{field}.kp"), g.kp)?;
    finite(&format!("{field}.ki"), g.ki)?;
    finite(&format!("{field}.kd"), g.kd)
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive and finite"))
    }
}

fn non_negative(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be non-negative and finite"))
    }
}
