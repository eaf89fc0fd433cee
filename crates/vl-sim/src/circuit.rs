//! CPAP circuit: blower plus patient interface, linearised for tuning.
//!
//! ```text
//!            kb            rl + rp rl c s
//! G(s) = ---------- * ---------------------
//!         s + 1/tb      1 + (rp + rl) c s
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vl_controls::TransferFunction;
use vl_core::{ensure_finite, ensure_positive, ml_per_liter, seconds_per_minute};

use crate::error::{SimError, SimResult};

/// Leak resistance of an intentional-leak mask at 30 L/min, cmH2O/(L/min).
pub const MASK_LEAK_RESISTANCE: f64 = 48.5;

/// Patient-side resistances and compliance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientParameters {
    /// Inspiratory resistance.
    pub rp: f64,
    /// Static compliance.
    pub c: f64,
    /// Leak resistance.
    pub rl: f64,
}

impl PatientParameters {
    pub fn new(rp: f64, c: f64, rl: f64) -> SimResult<Self> {
        Ok(Self {
            rp: ensure_positive(rp, "patient resistance rp must be positive")?,
            c: ensure_positive(c, "patient compliance c must be positive")?,
            rl: ensure_positive(rl, "leak resistance rl must be positive")?,
        })
    }
}

/// Humidification device on the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Humidifier {
    HeatedHumidifier,
    HeatMoistureExchanger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Normal,
    Copd,
    MildArds,
    ModerateArds,
    SevereArds,
}

/// Named patient presets: humidifier x lung condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientPreset {
    pub humidifier: Humidifier,
    pub condition: Condition,
}

impl PatientPreset {
    pub const fn new(humidifier: Humidifier, condition: Condition) -> Self {
        Self {
            humidifier,
            condition,
        }
    }

    pub const ALL: [PatientPreset; 10] = {
        use Condition::*;
        use Humidifier::*;
        [
            Self::new(HeatedHumidifier, Normal),
            Self::new(HeatedHumidifier, Copd),
            Self::new(HeatedHumidifier, MildArds),
            Self::new(HeatedHumidifier, ModerateArds),
            Self::new(HeatedHumidifier, SevereArds),
            Self::new(HeatMoistureExchanger, Normal),
            Self::new(HeatMoistureExchanger, Copd),
            Self::new(HeatMoistureExchanger, MildArds),
            Self::new(HeatMoistureExchanger, ModerateArds),
            Self::new(HeatMoistureExchanger, SevereArds),
        ]
    };

    pub fn parameters(self) -> PatientParameters {
        let base_rp = match self.humidifier {
            Humidifier::HeatedHumidifier => 10e-3,
            Humidifier::HeatMoistureExchanger => 15e-3,
        };
        let (rp, c) = match self.condition {
            Condition::Normal => (base_rp, 50.0),
            Condition::Copd => (base_rp + 10e-3, 60.0),
            Condition::MildArds => (base_rp, 45.0),
            Condition::ModerateArds => (base_rp, 40.0),
            Condition::SevereArds => (base_rp, 35.0),
        };
        PatientParameters {
            rp,
            c,
            rl: MASK_LEAK_RESISTANCE * seconds_per_minute() / ml_per_liter(),
        }
    }

    /// Short identifier, e.g. `hh-normal`, `hme-severe-ards`.
    pub fn slug(self) -> String {
        let device = match self.humidifier {
            Humidifier::HeatedHumidifier => "hh",
            Humidifier::HeatMoistureExchanger => "hme",
        };
        let condition = match self.condition {
            Condition::Normal => "normal",
            Condition::Copd => "copd",
            Condition::MildArds => "mild-ards",
            Condition::ModerateArds => "moderate-ards",
            Condition::SevereArds => "severe-ards",
        };
        format!("{device}-{condition}")
    }
}

impl Default for PatientPreset {
    fn default() -> Self {
        Self::new(Humidifier::HeatedHumidifier, Condition::Normal)
    }
}

impl fmt::Display for PatientPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.humidifier {
            Humidifier::HeatedHumidifier => "Heated Humidifier",
            Humidifier::HeatMoistureExchanger => "Heat Moisture Exchange",
        };
        let condition = match self.condition {
            Condition::Normal => "Normal",
            Condition::Copd => "COPD",
            Condition::MildArds => "mild ARDS",
            Condition::ModerateArds => "moderate ARDS",
            Condition::SevereArds => "severe ARDS",
        };
        write!(f, "{device}, {condition}")
    }
}

impl FromStr for PatientPreset {
    type Err = SimError;

    /// Accepts the slug (`hh-copd`) or the display name
    /// (`Heated Humidifier, COPD`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.slug() == wanted || p.to_string().to_ascii_lowercase() == wanted)
            .ok_or_else(|| SimError::UnknownName {
                kind: "patient preset",
                name: s.to_string(),
            })
    }
}

/// First-order blower: time constant `tb` (s) and gain `kb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlowerParameters {
    pub tb: f64,
    pub kb: f64,
}

impl BlowerParameters {
    pub fn new(tb: f64, kb: f64) -> SimResult<Self> {
        Ok(Self {
            tb: ensure_positive(tb, "blower time constant must be positive")?,
            kb: ensure_finite(kb, "blower gain")?,
        })
    }
}

impl Default for BlowerParameters {
    fn default() -> Self {
        Self { tb: 10e-3, kb: 0.5 }
    }
}

/// Linearised blower-to-pressure model used by both tuners.
pub fn cpap_plant(
    blower: &BlowerParameters,
    patient: &PatientParameters,
) -> SimResult<TransferFunction> {
    let PatientParameters { rp, c, rl } = *patient;
    let blower_tf = TransferFunction::new(vec![blower.kb], vec![1.0, 1.0 / blower.tb])?;
    let patient_tf = TransferFunction::new(vec![rp * rl * c, rl], vec![(rp + rl) * c, 1.0])?;
    Ok(blower_tf.series(&patient_tf)?)
}
