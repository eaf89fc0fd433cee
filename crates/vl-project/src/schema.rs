//! Scenario schema definitions.

use serde::{Deserialize, Serialize};
use vl_controls::{AntiWindup, BackendKind, ControllerFamily, PidGains};
use vl_sim::{Phase, TrackedVariable};
use vl_tuning::{MinimizerConfig, OptimizationMethod};

pub const SCHEMA_VERSION: u32 = 1;

/// One ventilation scenario: patient, machine, controller and how its gains
/// are obtained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub lung: LungDef,
    #[serde(default)]
    pub ventilator: VentilatorDef,
    #[serde(default)]
    pub circuit: CircuitDef,
    #[serde(default)]
    pub simulation: SimulationDef,
    pub setpoints: ScheduleDef,
    #[serde(default)]
    pub controller: ControllerDef,
    #[serde(default)]
    pub tuning: TuningDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LungDef {
    /// cmH2O/(L/s)
    pub airway_resistance: f64,
    /// mL/cmH2O
    pub compliance: f64,
}

impl Default for LungDef {
    fn default() -> Self {
        Self {
            airway_resistance: 3.0,
            compliance: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VentilatorDef {
    pub tidal_volume_ml: f64,
    pub peep_cmh2o: f64,
    pub respiratory_rate_per_min: f64,
    pub inspiratory_time_s: f64,
    #[serde(default = "default_pause_time")]
    pub pause_time_s: f64,
}

fn default_pause_time() -> f64 {
    0.25
}

impl Default for VentilatorDef {
    fn default() -> Self {
        Self {
            tidal_volume_ml: 350.0,
            peep_cmh2o: 5.0,
            respiratory_rate_per_min: 15.0,
            inspiratory_time_s: 1.0,
            pause_time_s: default_pause_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CircuitDef {
    #[serde(default)]
    pub patient: PatientDef,
    #[serde(default)]
    pub blower: BlowerDef,
}

/// Patient side of the CPAP circuit.
///
/// ```yaml
/// patient:
///   type: Preset
///   preset: hme-moderate-ards
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum PatientDef {
    Preset {
        preset: String,
    },
    Custom {
        /// Airway resistance.
        rp: f64,
        /// Compliance.
        c: f64,
        /// Leak resistance.
        rl: f64,
    },
}

impl Default for PatientDef {
    fn default() -> Self {
        Self::Preset {
            preset: "hh-normal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlowerDef {
    pub time_constant_s: f64,
    pub gain: f64,
}

impl Default for BlowerDef {
    fn default() -> Self {
        Self {
            time_constant_s: 10e-3,
            gain: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    pub sample_frequency_hz: f64,
    pub max_steps: usize,
    #[serde(default)]
    pub initial_phase: Phase,
    #[serde(default)]
    pub initial_volume_ml: f64,
    /// Defaults to PEEP when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_pressure_cmh2o: Option<f64>,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            sample_frequency_hz: 30.0,
            max_steps: 1500,
            initial_phase: Phase::Exhale,
            initial_volume_ml: 0.0,
            initial_pressure_cmh2o: None,
        }
    }
}

/// Piecewise-constant reference: `set_points[k]` for `intervals[k]` ticks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub set_points: Vec<f64>,
    pub intervals: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFormulaDef {
    #[default]
    Difference,
    DifferenceSquared,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerDef {
    pub integrator_min: f64,
    pub integrator_max: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default)]
    pub use_derivative: bool,
    #[serde(default)]
    pub anti_windup: AntiWindup,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub error_formula: ErrorFormulaDef,
    #[serde(default)]
    pub tracked: TrackedVariable,
}

fn default_dt() -> f64 {
    1.0
}

impl Default for ControllerDef {
    fn default() -> Self {
        Self {
            integrator_min: -10.0,
            integrator_max: 10.0,
            dt: default_dt(),
            use_derivative: false,
            anti_windup: AntiWindup::default(),
            backend: BackendKind::default(),
            error_formula: ErrorFormulaDef::default(),
            tracked: TrackedVariable::default(),
        }
    }
}

/// Where the controller gains come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TuningDef {
    ZieglerNichols {
        #[serde(default)]
        family: ControllerFamily,
    },
    Optimize {
        #[serde(default)]
        method: OptimizationMethod,
        #[serde(default)]
        family: ControllerFamily,
        initial: PidGains,
        #[serde(default)]
        minimizer: MinimizerConfig,
    },
    Fixed {
        gains: PidGains,
    },
}

impl Default for TuningDef {
    fn default() -> Self {
        Self::Optimize {
            method: OptimizationMethod::NelderMead,
            family: ControllerFamily::PI,
            initial: PidGains::new(1.0, 1.0, 0.0),
            minimizer: MinimizerConfig::default(),
        }
    }
}

impl TuningDef {
    pub fn family(&self) -> ControllerFamily {
        match self {
            Self::ZieglerNichols { family } | Self::Optimize { family, .. } => *family,
            Self::Fixed { .. } => ControllerFamily::PID,
        }
    }
}
