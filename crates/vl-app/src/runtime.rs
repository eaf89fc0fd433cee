//! Scenario to runtime objects.
//!
//! A [`ScenarioRuntime`] is immutable and cheap to clone; plants and
//! controllers are built fresh from it for every episode so parallel
//! episodes never share state.

use vl_controls::{
    BackendKind, ControllerBackend, DiscreteOptions, IntegratorBounds, PidGains,
    TransferFunction, build_backend,
};
use vl_project::schema::{ErrorFormulaDef, PatientDef, Scenario};
use vl_sim::{
    BlowerParameters, EpisodeOptions, ErrorFormula, LungParameters, PatientParameters,
    PatientPreset, PiecewiseSchedule, PlantConfig, RespiratoryPlant, VentilatorParameters,
    cpap_plant,
};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ScenarioRuntime {
    pub lung: LungParameters,
    pub ventilator: VentilatorParameters,
    pub plant_config: PlantConfig,
    pub patient: PatientParameters,
    /// Preset name or `custom`.
    pub patient_label: String,
    pub blower: BlowerParameters,
    /// Linearised blower and patient circuit the tuners run against.
    pub plant_tf: TransferFunction,
    pub schedule: PiecewiseSchedule,
    pub episode: EpisodeOptions,
    pub backend: BackendKind,
    pub discrete: DiscreteOptions,
}

/// Validate and convert every scenario section.
pub fn build_runtime(scenario: &Scenario) -> AppResult<ScenarioRuntime> {
    vl_project::validate_scenario(scenario)?;

    let lung = LungParameters::new(scenario.lung.airway_resistance, scenario.lung.compliance)?;
    let v = &scenario.ventilator;
    let ventilator = VentilatorParameters::new(
        v.tidal_volume_ml,
        v.peep_cmh2o,
        v.respiratory_rate_per_min,
        v.inspiratory_time_s,
        v.pause_time_s,
    )?;

    let sim = &scenario.simulation;
    let plant_config = PlantConfig {
        sample_frequency: sim.sample_frequency_hz,
        initial_phase: sim.initial_phase,
        initial_volume: sim.initial_volume_ml,
        initial_pressure: sim.initial_pressure_cmh2o,
    };

    let (patient, patient_label) = match &scenario.circuit.patient {
        PatientDef::Preset { preset } => {
            let p: PatientPreset = preset.parse()?;
            (p.parameters(), p.to_string())
        }
        PatientDef::Custom { rp, c, rl } => {
            (PatientParameters::new(*rp, *c, *rl)?, "custom".to_string())
        }
    };
    let blower = BlowerParameters::new(
        scenario.circuit.blower.time_constant_s,
        scenario.circuit.blower.gain,
    )?;
    let plant_tf = cpap_plant(&blower, &patient)?;

    let schedule = PiecewiseSchedule::new(
        scenario.setpoints.set_points.clone(),
        scenario.setpoints.intervals.clone(),
    )?;

    let c = &scenario.controller;
    let episode = EpisodeOptions {
        max_steps: sim.max_steps,
        tracked: c.tracked,
        error_formula: match c.error_formula {
            ErrorFormulaDef::Difference => ErrorFormula::Difference,
            ErrorFormulaDef::DifferenceSquared => ErrorFormula::DifferenceSquared,
        },
    };
    let discrete = DiscreteOptions {
        bounds: IntegratorBounds::new(c.integrator_min, c.integrator_max)?,
        dt: c.dt,
        use_derivative: c.use_derivative,
        anti_windup: c.anti_windup,
    };

    Ok(ScenarioRuntime {
        lung,
        ventilator,
        plant_config,
        patient,
        patient_label,
        blower,
        plant_tf,
        schedule,
        episode,
        backend: c.backend,
        discrete,
    })
}

impl ScenarioRuntime {
    pub fn new_plant(&self) -> AppResult<RespiratoryPlant> {
        Ok(RespiratoryPlant::new(
            self.lung,
            self.ventilator,
            self.plant_config,
        )?)
    }

    pub fn new_controller(&self, gains: PidGains) -> AppResult<Box<dyn ControllerBackend>> {
        if !gains.is_finite() {
            return Err(AppError::InvalidInput(format!("non-finite gains: {gains}")));
        }
        Ok(build_backend(self.backend, gains, self.discrete)?)
    }

    /// Same scenario against another patient preset.
    pub fn with_patient(&self, preset: PatientPreset) -> AppResult<Self> {
        let patient = preset.parameters();
        Ok(Self {
            plant_tf: cpap_plant(&self.blower, &patient)?,
            patient,
            patient_label: preset.to_string(),
            ..self.clone()
        })
    }
}
