//! Closed-loop episodes: plant and controller strictly alternating.
//!
//! Each tick the plant consumes the previous action and reports its state,
//! the error against the setpoint is formed, and the controller produces the
//! action for the next tick.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use vl_controls::ControllerBackend;

use crate::error::{SimError, SimResult};
use crate::phase::Phase;
use crate::plant::{PlantObservation, RespiratoryPlant, TrackedVariable};
use crate::schedule::SetpointSource;

/// How the tracking error is formed from `(y, y_ref)`.
#[derive(Clone, Copy, Default)]
pub enum ErrorFormula {
    /// `y_ref - y`
    #[default]
    Difference,
    /// `-(y_ref - y)^2`
    DifferenceSquared,
    Custom(fn(f64, f64) -> f64),
}

impl ErrorFormula {
    pub fn apply(&self, y: f64, y_ref: f64) -> f64 {
        match self {
            Self::Difference => y_ref - y,
            Self::DifferenceSquared => -(y_ref - y).powi(2),
            Self::Custom(f) => f(y, y_ref),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Difference => "difference",
            Self::DifferenceSquared => "difference_squared",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for ErrorFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorFormula {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "difference" => Ok(Self::Difference),
            "difference_squared" | "difference-squared" => Ok(Self::DifferenceSquared),
            _ => Err(SimError::UnknownName {
                kind: "error formula",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpisodeOptions {
    /// Ticks to run.
    pub max_steps: usize,
    pub tracked: TrackedVariable,
    pub error_formula: ErrorFormula,
}

impl Default for EpisodeOptions {
    fn default() -> Self {
        Self {
            max_steps: 1500,
            tracked: TrackedVariable::default(),
            error_formula: ErrorFormula::default(),
        }
    }
}

/// One tick of a closed-loop episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSample {
    pub tick: u64,
    /// Seconds.
    pub time: f64,
    /// Phase the tick was computed in.
    pub phase: Phase,
    pub setpoint: f64,
    pub flow: f64,
    pub volume: f64,
    pub pressure: f64,
    pub error: f64,
    /// Running sum of `error` up to and including this tick.
    pub accumulated_error: f64,
    /// Controller output, applied on the next tick.
    pub action: f64,
}

impl EpisodeSample {
    pub fn observation(&self) -> PlantObservation {
        PlantObservation {
            flow: self.flow,
            volume: self.volume,
            pressure: self.pressure,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub samples: Vec<EpisodeSample>,
}

impl EpisodeRecord {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.error).collect()
    }

    pub fn last(&self) -> Option<&EpisodeSample> {
        self.samples.last()
    }
}

/// Run `options.max_steps` ticks of plant and controller.
pub fn run_episode(
    plant: &mut RespiratoryPlant,
    controller: &mut dyn ControllerBackend,
    setpoints: &dyn SetpointSource,
    options: &EpisodeOptions,
) -> SimResult<EpisodeRecord> {
    if options.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }

    info!(
        steps = options.max_steps,
        tracked = %options.tracked,
        error_formula = options.error_formula.name(),
        backend = %controller.kind(),
        gains = %controller.gains(),
        "episode start"
    );

    let mut samples = Vec::with_capacity(options.max_steps);
    let mut action = 0.0;
    let mut accumulated_error = 0.0;

    for _ in 0..options.max_steps {
        let tick = plant.state().tick();
        let time = plant.time();
        let phase = plant.state().phase();

        let obs = plant.step(action);
        if !obs.is_finite() {
            return Err(SimError::NonPhysical {
                tick,
                what: "plant state is not finite",
            });
        }

        let setpoint = setpoints.setpoint(tick);
        let error = options.error_formula.apply(obs.get(options.tracked), setpoint);
        accumulated_error += error;

        action = controller.tick(error);
        if !action.is_finite() {
            return Err(SimError::NonPhysical {
                tick,
                what: "controller action is not finite",
            });
        }

        samples.push(EpisodeSample {
            tick,
            time,
            phase,
            setpoint,
            flow: obs.flow,
            volume: obs.volume,
            pressure: obs.pressure,
            error,
            accumulated_error,
            action,
        });
    }

    info!(
        ticks = samples.len(),
        accumulated_error,
        "episode finished"
    );
    Ok(EpisodeRecord { samples })
}

/// Run independent episodes in parallel, one per item. Results keep the
/// order of `items`.
///
/// Every closure call must build its own plant and controller.
pub fn run_batch<T, R, F>(items: Vec<T>, run: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    items.into_par_iter().map(run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lung::LungParameters;
    use crate::plant::PlantConfig;
    use crate::schedule::ConstantSetpoint;
    use crate::ventilator::VentilatorParameters;
    use vl_controls::{DiscreteController, IntegratorBounds, PidGains};

    fn plant() -> RespiratoryPlant {
        RespiratoryPlant::new(
            LungParameters::default(),
            VentilatorParameters::default(),
            PlantConfig::default(),
        )
        .unwrap()
    }

    fn pi(kp: f64, ki: f64) -> DiscreteController {
        DiscreteController::new(
            PidGains::new(kp, ki, 0.0),
            IntegratorBounds::new(-10.0, 10.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn error_formulas() {
        assert_eq!(ErrorFormula::Difference.apply(3.0, 5.0), 2.0);
        assert_eq!(ErrorFormula::DifferenceSquared.apply(3.0, 5.0), -4.0);
        assert_eq!(ErrorFormula::Custom(|y, r| y * r).apply(3.0, 5.0), 15.0);
        assert_eq!(
            "difference_squared".parse::<ErrorFormula>().unwrap().name(),
            "difference_squared"
        );
        assert!("absolute".parse::<ErrorFormula>().is_err());
    }

    #[test]
    fn episode_records_every_tick() {
        let mut p = plant();
        let mut c = pi(1.0, 0.1);
        let opts = EpisodeOptions {
            max_steps: 300,
            ..EpisodeOptions::default()
        };
        let rec = run_episode(&mut p, &mut c, &ConstantSetpoint(10.0), &opts).unwrap();
        assert_eq!(rec.len(), 300);
        for (k, s) in rec.samples.iter().enumerate() {
            assert_eq!(s.tick, k as u64);
            assert!((s.error - (10.0 - s.pressure)).abs() < 1e-12);
        }
        let sum: f64 = rec.errors().iter().sum();
        assert!((rec.last().unwrap().accumulated_error - sum).abs() < 1e-9);
    }

    #[test]
    fn first_action_is_proportional_to_first_error() {
        let mut p = plant();
        let mut c = pi(2.0, 0.0);
        let opts = EpisodeOptions {
            max_steps: 1,
            ..EpisodeOptions::default()
        };
        let rec = run_episode(&mut p, &mut c, &ConstantSetpoint(8.0), &opts).unwrap();
        // plant sits at PEEP = 5 on the first tick
        assert_eq!(rec.samples[0].error, 3.0);
        assert_eq!(rec.samples[0].action, 6.0);
    }

    #[test]
    fn zero_steps_is_rejected() {
        let mut p = plant();
        let mut c = pi(1.0, 0.0);
        let opts = EpisodeOptions {
            max_steps: 0,
            ..EpisodeOptions::default()
        };
        assert!(run_episode(&mut p, &mut c, &ConstantSetpoint(1.0), &opts).is_err());
    }

    #[test]
    fn batch_keeps_order() {
        let out = run_batch(vec![1_u64, 2, 3, 4], |n| n * 10);
        assert_eq!(out, vec![10, 20, 30, 40]);
    }
}
