//! Setpoint sources for closed-loop episodes.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Supplies the reference value for a tick.
pub trait SetpointSource: Send + Sync {
    fn setpoint(&self, tick: u64) -> f64;
}

/// Same reference on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantSetpoint(pub f64);

impl SetpointSource for ConstantSetpoint {
    fn setpoint(&self, _tick: u64) -> f64 {
        self.0
    }
}

/// Holds `set_points[k]` for `intervals[k]` ticks, then the last set point
/// indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseSchedule {
    set_points: Vec<f64>,
    intervals: Vec<u64>,
}

impl PiecewiseSchedule {
    pub fn new(set_points: Vec<f64>, intervals: Vec<u64>) -> SimResult<Self> {
        if set_points.is_empty() {
            return Err(SimError::InvalidArg {
                what: "schedule needs at least one set point",
            });
        }
        if set_points.len() != intervals.len() {
            return Err(SimError::InvalidConfiguration {
                what: format!(
                    "{} set points but {} intervals",
                    set_points.len(),
                    intervals.len()
                ),
            });
        }
        if set_points.iter().any(|v| !v.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "set points must be finite",
            });
        }
        if intervals.contains(&0) {
            return Err(SimError::InvalidArg {
                what: "schedule intervals must be positive",
            });
        }
        Ok(Self {
            set_points,
            intervals,
        })
    }

    pub fn set_points(&self) -> &[f64] {
        &self.set_points
    }

    pub fn intervals(&self) -> &[u64] {
        &self.intervals
    }

    /// Ticks covered by the listed intervals.
    pub fn total_ticks(&self) -> u64 {
        self.intervals.iter().sum()
    }
}

impl SetpointSource for PiecewiseSchedule {
    fn setpoint(&self, tick: u64) -> f64 {
        let mut end = 0;
        for (value, len) in self.set_points.iter().zip(&self.intervals) {
            end += len;
            if tick < end {
                return *value;
            }
        }
        self.set_points[self.set_points.len() - 1]
    }
}
