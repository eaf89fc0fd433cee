//! Tick-by-tick respiratory plant.
//!
//! One call to [`RespiratoryPlant::step`] advances the phase machine by
//! `dt = 1 / sample_frequency`:
//!
//! - exhale: `flow = (PEEP - p) / R * exp(-(t - t_start) / (R C))`
//! - inhale: `flow = V_T / T_I`
//! - pause:  `flow = 0`
//!
//! then `volume += flow * dt` and `p = flow * R + volume / C + PEEP` in every
//! phase. Flow is carried in mL/s and reported in L/min.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;
use vl_core::{ensure_finite, ensure_positive, ml_per_s_to_l_per_min};

use crate::error::{SimError, SimResult};
use crate::lung::LungParameters;
use crate::phase::{Phase, SimulationPhaseState};
use crate::ventilator::VentilatorParameters;

/// Start-up settings of a plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Ticks per second.
    pub sample_frequency: f64,
    pub initial_phase: Phase,
    /// mL.
    pub initial_volume: f64,
    /// cmH2O; `None` starts at PEEP.
    pub initial_pressure: Option<f64>,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            sample_frequency: 30.0,
            initial_phase: Phase::Exhale,
            initial_volume: 0.0,
            initial_pressure: None,
        }
    }
}

/// Observable variables of the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedVariable {
    Flow,
    Volume,
    #[default]
    Pressure,
}

impl TrackedVariable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Volume => "volume",
            Self::Pressure => "pressure",
        }
    }
}

impl fmt::Display for TrackedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedVariable {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flow" | "x1" => Ok(Self::Flow),
            "volume" | "x2" => Ok(Self::Volume),
            "pressure" | "x3" => Ok(Self::Pressure),
            _ => Err(SimError::UnknownName {
                kind: "tracked variable",
                name: s.to_string(),
            }),
        }
    }
}

/// What the plant reports each tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlantObservation {
    /// L/min.
    pub flow: f64,
    /// mL.
    pub volume: f64,
    /// cmH2O.
    pub pressure: f64,
}

impl PlantObservation {
    pub fn get(&self, variable: TrackedVariable) -> f64 {
        match variable {
            TrackedVariable::Flow => self.flow,
            TrackedVariable::Volume => self.volume,
            TrackedVariable::Pressure => self.pressure,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.flow.is_finite() && self.volume.is_finite() && self.pressure.is_finite()
    }
}

/// Lumped lung on a volume-controlled ventilator.
#[derive(Debug, Clone)]
pub struct RespiratoryPlant {
    lung: LungParameters,
    ventilator: VentilatorParameters,
    config: PlantConfig,
    dt: f64,
    state: SimulationPhaseState,
    /// mL/s.
    flow: f64,
    volume: f64,
    pressure: f64,
    last_action: f64,
}

impl RespiratoryPlant {
    pub fn new(
        lung: LungParameters,
        ventilator: VentilatorParameters,
        config: PlantConfig,
    ) -> SimResult<Self> {
        let fs = ensure_positive(config.sample_frequency, "sample frequency must be positive")?;
        ensure_finite(config.initial_volume, "initial volume")?;
        if let Some(p) = config.initial_pressure {
            ensure_finite(p, "initial pressure")?;
        }

        let mut plant = Self {
            lung,
            ventilator,
            config,
            dt: 1.0 / fs,
            state: SimulationPhaseState::new(config.initial_phase),
            flow: 0.0,
            volume: 0.0,
            pressure: 0.0,
            last_action: 0.0,
        };
        plant.reset();
        Ok(plant)
    }

    /// Back to the configured initial condition.
    pub fn reset(&mut self) {
        self.state = SimulationPhaseState::new(self.config.initial_phase);
        self.flow = 0.0;
        self.volume = self.config.initial_volume;
        self.pressure = self
            .config
            .initial_pressure
            .unwrap_or_else(|| self.ventilator.peep());
        self.last_action = 0.0;
    }

    pub fn lung(&self) -> &LungParameters {
        &self.lung
    }

    pub fn ventilator(&self) -> &VentilatorParameters {
        &self.ventilator
    }

    pub fn sample_frequency(&self) -> f64 {
        self.config.sample_frequency
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn state(&self) -> &SimulationPhaseState {
        &self.state
    }

    /// Time of the next tick.
    pub fn time(&self) -> f64 {
        self.state.tick as f64 * self.dt
    }

    pub fn last_action(&self) -> f64 {
        self.last_action
    }

    /// Current state without advancing.
    pub fn observation(&self) -> PlantObservation {
        PlantObservation {
            flow: ml_per_s_to_l_per_min(self.flow),
            volume: self.volume,
            pressure: self.pressure,
        }
    }

    /// Advance one tick.
    ///
    /// `action` is recorded but does not enter the equations: the ventilator
    /// imposes the flow pattern.
    pub fn step(&mut self, action: f64) -> PlantObservation {
        self.last_action = action;

        let r = self.lung.airway_resistance_ml();
        let c = self.lung.compliance();
        let peep = self.ventilator.peep();
        let t = self.time();

        match self.state.phase {
            Phase::Exhale => {
                let elapsed = t - self.state.phase_start_time;
                self.flow = (peep - self.pressure) / r * (-elapsed / (r * c)).exp();
                self.volume += self.flow * self.dt;
            }
            Phase::Inhale => {
                self.flow = self.ventilator.inspiratory_flow();
                if self.state.tick == 0 {
                    self.volume = 0.0;
                } else {
                    self.volume += self.flow * self.dt;
                }
            }
            Phase::Pause => {
                self.flow = 0.0;
            }
        }
        self.pressure = self.flow * r + self.volume / c + peep;

        self.advance_phase();
        self.observation()
    }

    fn advance_phase(&mut self) {
        let state = &mut self.state;
        state.phase_counter += 1;
        let threshold = state.phase.duration(&self.ventilator) * self.config.sample_frequency;
        if state.phase_counter as f64 >= threshold {
            let from = state.phase;
            state.phase = from.next();
            state.phase_counter = 1;
            state.phase_start_time = (state.tick + 1) as f64 * self.dt;
            trace!(
                tick = state.tick,
                from = %from,
                to = %state.phase,
                volume = self.volume,
                pressure = self.pressure,
                "phase transition"
            );
        }
        state.tick += 1;
    }
}
