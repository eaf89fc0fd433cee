//! Respiratory plant simulation for ventilator pressure control.
//!
//! Provides:
//! - Single-compartment lung on a volume-controlled ventilator, ticked at a fixed rate
//! - Exhale / inhale / pause phase machine
//! - CPAP circuit presets and the linear blower-patient plant used for tuning
//! - Setpoint schedules and closed-loop episodes with a pluggable controller
//! - Parallel batches of independent episodes

pub mod circuit;
pub mod episode;
pub mod error;
pub mod lung;
pub mod phase;
pub mod plant;
pub mod schedule;
pub mod ventilator;

pub use circuit::{
    BlowerParameters, Condition, Humidifier, MASK_LEAK_RESISTANCE, PatientParameters,
    PatientPreset, cpap_plant,
};
pub use episode::{
    EpisodeOptions, EpisodeRecord, EpisodeSample, ErrorFormula, run_batch, run_episode,
};
pub use error::{SimError, SimResult};
pub use lung::LungParameters;
pub use phase::{Phase, SimulationPhaseState};
pub use plant::{PlantConfig, PlantObservation, RespiratoryPlant, TrackedVariable};
pub use schedule::{ConstantSetpoint, PiecewiseSchedule, SetpointSource};
pub use ventilator::VentilatorParameters;
