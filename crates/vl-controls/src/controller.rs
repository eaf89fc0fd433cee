//! Discrete-time PI/PID controller.
//!
//! The controller is advanced once per simulation tick with the current
//! tracking error and returns the control action:
//!
//! ```text
//! z_t = z_(t-1) + clamp(e_t * dt, min, max)
//! u_t = Kp * e_t + Ki * z_t                       (PI, default)
//! u_t = Kp * e_t + Ki * z_t + Kd * (e_t - e_(t-1)) / dt   (derivative enabled)
//! ```
//!
//! `dt` defaults to 1: the surrounding simulation steps at a fixed cadence and
//! the controller counts in ticks.

use serde::{Deserialize, Serialize};
use vl_core::ensure_positive;

use crate::error::{ControlError, ControlResult};
use crate::family::PidGains;

/// Clamp bounds for the integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorBounds {
    pub min: f64,
    pub max: f64,
}

impl IntegratorBounds {
    pub fn new(min: f64, max: f64) -> ControlResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "integrator bounds must be finite",
            });
        }
        if min > max {
            return Err(ControlError::InvalidArg {
                what: "integrator min must not exceed max",
            });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.min, self.max)
    }
}

/// Where the integrator clamp is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntiWindup {
    /// Clamp each increment `e * dt` before it is accumulated. The running
    /// integral itself is unbounded.
    #[default]
    PerStep,
    /// Clamp the running integral after accumulation.
    Accumulated,
}

/// Mutable controller state. Only [`DiscreteController::tick`] and
/// [`DiscreteController::reset`] write it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    /// Integral accumulator.
    pub integral: f64,
    /// Error seen on the previous tick.
    pub previous_error: f64,
}

/// Stateful discrete PI/PID controller.
///
/// # Example
///
/// ```
/// use vl_controls::{DiscreteController, IntegratorBounds, PidGains};
///
/// let bounds = IntegratorBounds::new(-1.0, 1.0).unwrap();
/// let mut pid = DiscreteController::new(PidGains::new(2.0, 0.5, 0.0), bounds).unwrap();
///
/// // First tick: integral = clamp(3.0, -1, 1) = 1
/// let u = pid.tick(3.0);
/// assert_eq!(u, 2.0 * 3.0 + 0.5 * 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteController {
    gains: PidGains,
    bounds: IntegratorBounds,
    dt: f64,
    use_derivative: bool,
    anti_windup: AntiWindup,
    state: ControllerState,
}

impl DiscreteController {
    /// Create a PI controller with `dt = 1`.
    pub fn new(gains: PidGains, bounds: IntegratorBounds) -> ControlResult<Self> {
        if !gains.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "controller gains must be finite",
            });
        }
        Ok(Self {
            gains,
            bounds,
            dt: 1.0,
            use_derivative: false,
            anti_windup: AntiWindup::default(),
            state: ControllerState::default(),
        })
    }

    /// Set the step size. Must be positive: the integral increment and the
    /// derivative both scale with it.
    pub fn with_dt(mut self, dt: f64) -> ControlResult<Self> {
        self.dt = ensure_positive(dt, "controller dt must be positive")?;
        Ok(self)
    }

    /// Enable the derivative term.
    pub fn with_derivative(mut self, use_derivative: bool) -> Self {
        self.use_derivative = use_derivative;
        self
    }

    pub fn with_anti_windup(mut self, anti_windup: AntiWindup) -> Self {
        self.anti_windup = anti_windup;
        self
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn bounds(&self) -> IntegratorBounds {
        self.bounds
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn uses_derivative(&self) -> bool {
        self.use_derivative
    }

    pub fn anti_windup(&self) -> AntiWindup {
        self.anti_windup
    }

    /// Snapshot of the internal state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Advance one tick with the current error and return the action.
    pub fn tick(&mut self, error: f64) -> f64 {
        let increment = error * self.dt;
        let integral = match self.anti_windup {
            AntiWindup::PerStep => self.state.integral + self.bounds.clamp(increment),
            AntiWindup::Accumulated => self.bounds.clamp(self.state.integral + increment),
        };

        let mut output = self.gains.kp * error + self.gains.ki * integral;
        if self.use_derivative {
            let derivative = (error - self.state.previous_error) / self.dt;
            output += self.gains.kd * derivative;
        }

        self.state = ControllerState {
            integral,
            previous_error: error,
        };

        output
    }

    /// Return to the initial state (zero integral, zero previous error).
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: f64, max: f64) -> IntegratorBounds {
        IntegratorBounds::new(min, max).unwrap()
    }

    #[test]
    fn pi_accumulates_integral() {
        let mut pi = DiscreteController::new(PidGains::new(1.0, 0.5, 0.0), bounds(-10.0, 10.0))
            .unwrap();
        pi.tick(1.0);
        pi.tick(1.0);
        let u = pi.tick(1.0);
        assert_eq!(pi.state().integral, 3.0);
        assert_eq!(u, 1.0 + 0.5 * 3.0);
    }

    #[test]
    fn per_step_clamp_bounds_the_increment_not_the_sum() {
        let mut pi = DiscreteController::new(PidGains::new(0.0, 1.0, 0.0), bounds(-1.0, 1.0))
            .unwrap();
        for _ in 0..5 {
            pi.tick(100.0);
        }
        // five increments of at most 1 each
        assert_eq!(pi.state().integral, 5.0);
    }

    #[test]
    fn accumulated_clamp_bounds_the_sum() {
        let mut pi = DiscreteController::new(PidGains::new(0.0, 1.0, 0.0), bounds(-1.0, 1.0))
            .unwrap()
            .with_anti_windup(AntiWindup::Accumulated);
        for _ in 0..5 {
            pi.tick(100.0);
        }
        assert_eq!(pi.state().integral, 1.0);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = DiscreteController::new(PidGains::new(0.0, 0.0, 2.0), bounds(-1.0, 1.0))
            .unwrap()
            .with_derivative(true)
            .with_dt(0.5)
            .unwrap();
        // (1 - 0) / 0.5 * 2
        assert_eq!(pid.tick(1.0), 4.0);
        // (4 - 1) / 0.5 * 2
        assert_eq!(pid.tick(4.0), 12.0);
        assert_eq!(pid.state().previous_error, 4.0);
    }

    #[test]
    fn derivative_disabled_ignores_kd() {
        let mut pi = DiscreteController::new(PidGains::new(1.0, 0.0, 100.0), bounds(-1.0, 1.0))
            .unwrap();
        assert_eq!(pi.tick(2.0), 2.0);
        assert_eq!(pi.tick(5.0), 5.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut pi = DiscreteController::new(PidGains::new(1.0, 1.0, 0.0), bounds(-5.0, 5.0))
            .unwrap();
        pi.tick(3.0);
        pi.reset();
        assert_eq!(pi.state(), ControllerState::default());
    }

    #[test]
    fn invalid_configuration() {
        assert!(IntegratorBounds::new(1.0, -1.0).is_err());
        assert!(IntegratorBounds::new(f64::NEG_INFINITY, 1.0).is_err());
        let ok = DiscreteController::new(PidGains::new(1.0, 1.0, 0.0), bounds(-1.0, 1.0)).unwrap();
        assert!(ok.clone().with_dt(0.0).is_err());
        assert!(ok.with_dt(-1.0).is_err());
        assert!(
            DiscreteController::new(PidGains::new(f64::NAN, 0.0, 0.0), bounds(-1.0, 1.0)).is_err()
        );
    }
}
