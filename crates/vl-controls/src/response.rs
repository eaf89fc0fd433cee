//! Time responses of state-space models.
//!
//! Each grid interval is discretised exactly with the input interpolated
//! linearly between samples (first-order hold), using the matrix exponential
//! of the augmented system
//!
//! ```text
//!     | A h   B h   0 |
//! M = |  0     0    1 |      x(k+1) = E11 x(k) + E12 u(k) + E13 (u(k+1) - u(k))
//!     |  0     0    0 |
//! ```

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vl_core::linspace;

use crate::error::{ControlError, ControlResult};
use crate::lti::StateSpace;

const DEFAULT_HORIZON_S: f64 = 10.0;
const SETTLING_TIME_CONSTANTS: f64 = 7.0;
const MIN_POINTS: usize = 100;
const MAX_POINTS: usize = 10_000;

/// Strictly increasing sample times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    t: Vec<f64>,
}

impl TimeGrid {
    pub fn new(t: Vec<f64>) -> ControlResult<Self> {
        if t.len() < 2 {
            return Err(ControlError::InvalidGrid {
                what: "at least two samples are required",
            });
        }
        if t.iter().any(|v| !v.is_finite()) {
            return Err(ControlError::InvalidGrid {
                what: "sample times must be finite",
            });
        }
        if t.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ControlError::InvalidGrid {
                what: "sample times must be strictly increasing",
            });
        }
        Ok(Self { t })
    }

    /// `n` evenly spaced samples over `[start, stop]`.
    pub fn linspace(start: f64, stop: f64, n: usize) -> ControlResult<Self> {
        Self::new(linspace(start, stop, n))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.t
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn end(&self) -> f64 {
        self.t[self.t.len() - 1]
    }
}

/// Output samples paired with their times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeResponse {
    pub t: Vec<f64>,
    pub y: Vec<f64>,
}

impl TimeResponse {
    /// Largest output value.
    pub fn peak(&self) -> f64 {
        peak(&self.y)
    }

    pub fn final_value(&self) -> f64 {
        self.y.last().copied().unwrap_or(0.0)
    }
}

/// Largest value of a sampled signal (`-inf` when empty).
pub fn peak(y: &[f64]) -> f64 {
    y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Response to an arbitrary input sampled on `grid`, starting from `x0`
/// (zero state when `None`).
pub fn forced_response(
    sys: &StateSpace,
    grid: &TimeGrid,
    input: &[f64],
    x0: Option<&DVector<f64>>,
) -> ControlResult<TimeResponse> {
    if input.len() != grid.len() {
        return Err(ControlError::InvalidGrid {
            what: "input length must match the time grid",
        });
    }
    let n = sys.order();
    let mut x = match x0 {
        Some(x0) if x0.len() != n => {
            return Err(ControlError::InvalidArg {
                what: "initial state length must match the system order",
            });
        }
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    let t = grid.as_slice();
    let mut y = Vec::with_capacity(t.len());
    y.push(sys.output(&x, input[0]));

    let mut hold: Option<Hold> = None;
    for k in 0..t.len() - 1 {
        if n > 0 {
            let h = t[k + 1] - t[k];
            if hold.as_ref().is_none_or(|d| !d.matches(h)) {
                hold = Some(Hold::new(sys, h)?);
            }
            if let Some(d) = &hold {
                x = d.advance(&x, input[k], input[k + 1]);
            }
        }
        let out = sys.output(&x, input[k + 1]);
        if !out.is_finite() {
            return Err(ControlError::Numeric {
                what: format!("response diverged at t = {}", t[k + 1]),
            });
        }
        y.push(out);
    }

    Ok(TimeResponse { t: t.to_vec(), y })
}

/// Unit-step response from rest.
pub fn step_response(sys: &StateSpace, grid: &TimeGrid) -> ControlResult<TimeResponse> {
    let input = vec![1.0; grid.len()];
    forced_response(sys, grid, &input, None)
}

/// Horizon and resolution picked from the pole locations: about seven of the
/// slowest stable time constants, sampled finely enough for the fastest pole.
pub fn default_step_grid(sys: &StateSpace) -> ControlResult<TimeGrid> {
    if sys.order() == 0 {
        return TimeGrid::linspace(0.0, DEFAULT_HORIZON_S, MIN_POINTS);
    }

    let slowest_stable = sys
        .pole_real_parts()
        .into_iter()
        .filter(|re| *re < 0.0)
        .map(|re| -re)
        .fold(f64::INFINITY, f64::min);
    let tfinal = if slowest_stable.is_finite() && slowest_stable > 0.0 {
        SETTLING_TIME_CONSTANTS / slowest_stable
    } else {
        debug!(order = sys.order(), "no stable pole, using default step horizon");
        DEFAULT_HORIZON_S
    };

    let fastest = sys.spectral_radius();
    let mut dt = tfinal / MIN_POINTS as f64;
    if fastest > 0.0 {
        dt = dt.min(1.0 / (10.0 * fastest));
    }

    let points = ((tfinal / dt).ceil() as usize + 1).clamp(MIN_POINTS, MAX_POINTS);
    TimeGrid::linspace(0.0, tfinal, points)
}

/// Exact first-order-hold discretisation for one step size.
struct Hold {
    h: f64,
    phi: DMatrix<f64>,
    gamma0: DVector<f64>,
    gamma1: DVector<f64>,
}

impl Hold {
    fn new(sys: &StateSpace, h: f64) -> ControlResult<Self> {
        let n = sys.order();
        let mut m = DMatrix::zeros(n + 2, n + 2);
        m.view_mut((0, 0), (n, n)).copy_from(&(&sys.a * h));
        m.view_mut((0, n), (n, 1)).copy_from(&(&sys.b * h));
        m[(n, n + 1)] = 1.0;

        let e = m.exp();
        if e.iter().any(|v| !v.is_finite()) {
            return Err(ControlError::Numeric {
                what: format!("matrix exponential overflowed for step {h}"),
            });
        }

        Ok(Self {
            h,
            phi: e.view((0, 0), (n, n)).into_owned(),
            gamma0: e.view((0, n), (n, 1)).column(0).into_owned(),
            gamma1: e.view((0, n + 1), (n, 1)).column(0).into_owned(),
        })
    }

    fn matches(&self, h: f64) -> bool {
        (self.h - h).abs() <= 1e-12 * h.abs()
    }

    fn advance(&self, x: &DVector<f64>, u0: f64, u1: f64) -> DVector<f64> {
        &self.phi * x + &self.gamma0 * u0 + &self.gamma1 * (u1 - u0)
    }
}
