//! Interchangeable realisations of a tuned gain triple.
//!
//! Both backends answer one control action per simulation tick. The discrete
//! recurrence is the default; the continuous backend resamples a continuous
//! PID transfer function over a near-instantaneous interval on every tick.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vl_core::ensure_positive;

use crate::controller::{AntiWindup, DiscreteController, IntegratorBounds};
use crate::error::{ControlError, ControlResult};
use crate::family::PidGains;
use crate::lti::{StateSpace, TransferFunction};
use crate::response::{TimeGrid, forced_response};

/// Pole offset that keeps the continuous PID proper: `s^2 + eps s + eps`.
pub const PID_POLE_OFFSET: f64 = 1e-3;

/// Default resampling interval of [`ContinuousPid`] in seconds.
pub const DEFAULT_RESAMPLE_INTERVAL: f64 = 1e-6;

/// A per-tick controller.
pub trait ControllerBackend: Send {
    /// Consume the tracking error and return the control action.
    fn tick(&mut self, error: f64) -> f64;

    /// Return to the initial state.
    fn reset(&mut self);

    fn gains(&self) -> PidGains;

    fn kind(&self) -> BackendKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Discrete,
    Continuous,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discrete => "discrete",
            Self::Continuous => "continuous",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Ok(Self::Discrete),
            "continuous" => Ok(Self::Continuous),
            _ => Err(ControlError::UnknownBackend {
                name: s.to_string(),
            }),
        }
    }
}

impl ControllerBackend for DiscreteController {
    fn tick(&mut self, error: f64) -> f64 {
        DiscreteController::tick(self, error)
    }

    fn reset(&mut self) {
        DiscreteController::reset(self)
    }

    fn gains(&self) -> PidGains {
        DiscreteController::gains(self)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Discrete
    }
}

/// Continuous PID `(Kd s^2 + Kp s + Ki) / (s^2 + eps s + eps)` resampled per
/// tick.
///
/// Every tick forces the system from rest with the two-point input
/// `[0, error]` over `[0, interval]` and returns the final output, so the
/// answer carries no memory between ticks.
#[derive(Debug, Clone)]
pub struct ContinuousPid {
    gains: PidGains,
    transfer: TransferFunction,
    realisation: StateSpace,
    grid: TimeGrid,
}

impl ContinuousPid {
    pub fn new(gains: PidGains) -> ControlResult<Self> {
        Self::with_interval(gains, DEFAULT_RESAMPLE_INTERVAL)
    }

    pub fn with_interval(gains: PidGains, interval: f64) -> ControlResult<Self> {
        let interval = ensure_positive(interval, "resampling interval must be positive")?;
        let transfer = pid_transfer_function(gains)?;
        let realisation = transfer.to_state_space();
        Ok(Self {
            gains,
            transfer,
            realisation,
            grid: TimeGrid::new(vec![0.0, interval])?,
        })
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer
    }

    pub fn interval(&self) -> f64 {
        self.grid.end()
    }

    /// Fallible form of [`ControllerBackend::tick`].
    pub fn try_tick(&self, error: f64) -> ControlResult<f64> {
        let response = forced_response(&self.realisation, &self.grid, &[0.0, error], None)?;
        Ok(response.final_value())
    }
}

impl ControllerBackend for ContinuousPid {
    fn tick(&mut self, error: f64) -> f64 {
        match self.try_tick(error) {
            Ok(u) => u,
            Err(e) => {
                // a diverging response has no usable action
                warn!(error, gains = %self.gains, reason = %e, "continuous PID tick failed");
                f64::NAN
            }
        }
    }

    fn reset(&mut self) {}

    fn gains(&self) -> PidGains {
        self.gains
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Continuous
    }
}

/// `(Kd s^2 + Kp s + Ki) / (s^2 + eps s + eps)`.
pub fn pid_transfer_function(gains: PidGains) -> ControlResult<TransferFunction> {
    TransferFunction::new(
        vec![gains.kd, gains.kp, gains.ki],
        vec![1.0, PID_POLE_OFFSET, PID_POLE_OFFSET],
    )
}

/// Options for [`build_backend`] that only the discrete recurrence reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteOptions {
    pub bounds: IntegratorBounds,
    pub dt: f64,
    pub use_derivative: bool,
    pub anti_windup: AntiWindup,
}

/// Realise `gains` with the requested backend.
pub fn build_backend(
    kind: BackendKind,
    gains: PidGains,
    options: DiscreteOptions,
) -> ControlResult<Box<dyn ControllerBackend>> {
    Ok(match kind {
        BackendKind::Discrete => Box::new(
            DiscreteController::new(gains, options.bounds)?
                .with_dt(options.dt)?
                .with_derivative(options.use_derivative)
                .with_anti_windup(options.anti_windup),
        ),
        BackendKind::Continuous => Box::new(ContinuousPid::new(gains)?),
    })
}
