//! Gain search over the closed-loop step response.
//!
//! The cost of a gain triple is the summed absolute tracking error of the
//! unity-feedback loop `C(s) G(s) / (1 + C(s) G(s))` to a unit step, with
//! `C(s) = (Kd s^2 + Kp s + Ki) / (s^2 + eps s + eps)`. Only the gains the
//! controller family uses are free; the others stay at zero.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vl_controls::{
    ControllerFamily, PidGains, TimeGrid, TransferFunction, pid_transfer_function,
    step_response,
};

use crate::error::{TuningError, TuningResult};
use crate::minimize::{MinimizerConfig, OptimizationMethod, TerminationStatus, minimize};

/// Horizon of the objective's step response in seconds.
pub const OBJECTIVE_HORIZON: f64 = 10.0;
pub const OBJECTIVE_SAMPLES: usize = 1000;

/// Closed-loop step tracking cost for one plant and family.
#[derive(Debug, Clone)]
pub struct StepTrackingObjective {
    plant: TransferFunction,
    family: ControllerFamily,
    grid: TimeGrid,
}

impl StepTrackingObjective {
    pub fn new(plant: TransferFunction, family: ControllerFamily) -> TuningResult<Self> {
        let grid = TimeGrid::linspace(0.0, OBJECTIVE_HORIZON, OBJECTIVE_SAMPLES)?;
        Ok(Self {
            plant,
            family,
            grid,
        })
    }

    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn family(&self) -> ControllerFamily {
        self.family
    }

    /// Sum of `|1 - y|` over the grid.
    pub fn try_cost(&self, gains: PidGains) -> TuningResult<f64> {
        let controller = pid_transfer_function(self.family.mask(gains))?;
        let closed = controller.series(&self.plant)?.feedback_unity()?;
        let response = step_response(&closed.to_state_space(), &self.grid)?;
        Ok(response.y.iter().map(|y| (1.0 - y).abs()).sum())
    }

    /// Cost with every failure mapped to `+inf`.
    pub fn cost(&self, gains: PidGains) -> f64 {
        match self.try_cost(gains) {
            Ok(c) if c.is_finite() => c,
            _ => f64::INFINITY,
        }
    }

    /// Free variables of this family, in kp, ki, kd order.
    pub fn pack(&self, gains: PidGains) -> DVector<f64> {
        let n = self.family.free_gains();
        DVector::from_iterator(n, gains.as_array().into_iter().take(n))
    }

    pub fn unpack(&self, x: &DVector<f64>) -> PidGains {
        let mut g = [0.0; 3];
        for (slot, v) in g.iter_mut().zip(x.iter()) {
            *slot = *v;
        }
        self.family.mask(PidGains::from(g))
    }
}

/// What the optimizer returned, including how it stopped.
///
/// Costs are `+inf` for an unstable loop and are stored as `null` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub method: OptimizationMethod,
    pub gains: PidGains,
    #[serde(with = "cost_or_null")]
    pub initial_cost: f64,
    #[serde(with = "cost_or_null")]
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
    pub status: TerminationStatus,
}

mod cost_or_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cost: &f64, s: S) -> Result<S::Ok, S::Error> {
        if cost.is_finite() {
            s.serialize_some(cost)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OptimizationTuner {
    method: OptimizationMethod,
    config: MinimizerConfig,
    grid: Option<TimeGrid>,
}

impl OptimizationTuner {
    pub fn new(method: OptimizationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: MinimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Evaluate the objective on `grid` instead of `[0, 10]` s x 1000.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn method(&self) -> OptimizationMethod {
        self.method
    }

    pub fn tune(
        &self,
        plant: &TransferFunction,
        family: ControllerFamily,
        initial: PidGains,
    ) -> TuningResult<OptimizationReport> {
        if !initial.is_finite() {
            return Err(TuningError::InvalidArg {
                what: "initial gains must be finite",
            });
        }
        let mut objective = StepTrackingObjective::new(plant.clone(), family)?;
        if let Some(grid) = &self.grid {
            objective = objective.with_grid(grid.clone());
        }

        let x0 = objective.pack(initial);
        let initial_cost = objective.cost(objective.unpack(&x0));
        debug!(method = %self.method, %family, %initial, initial_cost, "starting gain search");

        let min = minimize(
            self.method,
            |x: &DVector<f64>| objective.cost(objective.unpack(x)),
            x0,
            &self.config,
        );
        let gains = objective.unpack(&min.x);

        let report = OptimizationReport {
            method: self.method,
            gains,
            initial_cost,
            cost: min.cost,
            iterations: min.iterations,
            evaluations: min.evaluations,
            converged: min.converged(),
            status: min.status,
        };

        if report.converged {
            info!(
                method = %self.method, %family, %gains, cost = report.cost,
                iterations = report.iterations, "gain search converged"
            );
        } else {
            warn!(
                method = %self.method, %family, %gains, cost = report.cost,
                status = %report.status, "gain search did not converge"
            );
        }
        Ok(report)
    }
}
