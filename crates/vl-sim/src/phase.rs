//! Respiratory phase state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::ventilator::VentilatorParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Exhale,
    Inhale,
    Pause,
}

impl Phase {
    /// Exhale -> inhale -> pause -> exhale.
    pub fn next(self) -> Self {
        match self {
            Self::Exhale => Self::Inhale,
            Self::Inhale => Self::Pause,
            Self::Pause => Self::Exhale,
        }
    }

    /// Configured length of this phase in seconds.
    pub fn duration(self, ventilator: &VentilatorParameters) -> f64 {
        match self {
            Self::Exhale => ventilator.expiratory_time(),
            Self::Inhale => ventilator.inspiratory_time(),
            Self::Pause => ventilator.pause_time(),
        }
    }

    /// Ticks spent in this phase per breath.
    ///
    /// The phase counter starts at 1 and is incremented before the boundary
    /// check `counter >= duration * fs`, so a phase lasts
    /// `max(1, ceil(duration * fs - 1))` ticks.
    pub fn ticks(self, ventilator: &VentilatorParameters, sample_frequency: f64) -> u64 {
        let threshold = self.duration(ventilator) * sample_frequency;
        ((threshold - 1.0).ceil().max(1.0)) as u64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exhale => "exhale",
            Self::Inhale => "inhale",
            Self::Pause => "pause",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhale" => Ok(Self::Exhale),
            "inhale" => Ok(Self::Inhale),
            "pause" => Ok(Self::Pause),
            _ => Err(SimError::UnknownName {
                kind: "phase",
                name: s.to_string(),
            }),
        }
    }
}

/// Phase bookkeeping owned by the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationPhaseState {
    /// Ticks since episode start. Never reset.
    pub(crate) tick: u64,
    /// Ticks into the current phase, starting at 1.
    pub(crate) phase_counter: u64,
    pub(crate) phase: Phase,
    /// Time of the first tick spent in the current phase.
    pub(crate) phase_start_time: f64,
}

impl SimulationPhaseState {
    pub fn new(initial_phase: Phase) -> Self {
        Self {
            tick: 0,
            phase_counter: 1,
            phase: initial_phase,
            phase_start_time: 0.0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase_counter(&self) -> u64 {
        self.phase_counter
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_start_time(&self) -> f64 {
        self.phase_start_time
    }
}

impl Default for SimulationPhaseState {
    fn default() -> Self {
        Self::new(Phase::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_order() {
        let mut p = Phase::Exhale;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(p);
            p = p.next();
        }
        assert_eq!(seen, [Phase::Exhale, Phase::Inhale, Phase::Pause, Phase::Exhale]);
    }

    #[test]
    fn ticks_per_phase_at_30_hz() {
        let v = VentilatorParameters::default();
        assert_eq!(Phase::Exhale.ticks(&v, 30.0), 82);
        assert_eq!(Phase::Inhale.ticks(&v, 30.0), 29);
        assert_eq!(Phase::Pause.ticks(&v, 30.0), 7);
    }

    #[test]
    fn zero_pause_still_takes_a_tick() {
        let v = VentilatorParameters::new(350.0, 5.0, 15.0, 1.0, 0.0).unwrap();
        assert_eq!(Phase::Pause.ticks(&v, 30.0), 1);
    }

    #[test]
    fn parse_phase() {
        assert_eq!("Inhale".parse::<Phase>().unwrap(), Phase::Inhale);
        assert!("hold".parse::<Phase>().is_err());
    }
}
