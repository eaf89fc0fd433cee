//! Volume-controlled ventilator settings.

use vl_core::{ensure_finite, ensure_positive, per_minute_to_hz};

use crate::error::{SimError, SimResult};

/// Ventilator settings. Cycle time, expiratory time and inspiratory flow are
/// derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VentilatorParameters {
    tidal_volume: f64,
    peep: f64,
    respiratory_rate: f64,
    inspiratory_time: f64,
    pause_time: f64,
}

impl VentilatorParameters {
    /// - `tidal_volume`: mL
    /// - `peep`: cmH2O
    /// - `respiratory_rate`: breaths per minute
    /// - `inspiratory_time`, `pause_time`: s
    ///
    /// Fails when the derived expiratory time is not positive.
    pub fn new(
        tidal_volume: f64,
        peep: f64,
        respiratory_rate: f64,
        inspiratory_time: f64,
        pause_time: f64,
    ) -> SimResult<Self> {
        let params = Self {
            tidal_volume: ensure_positive(tidal_volume, "tidal volume must be positive")?,
            peep: ensure_finite(peep, "PEEP")?,
            respiratory_rate: ensure_positive(respiratory_rate, "respiratory rate must be positive")?,
            inspiratory_time: ensure_positive(inspiratory_time, "inspiratory time must be positive")?,
            pause_time: ensure_finite(pause_time, "inspiratory pause time")?,
        };
        if params.pause_time < 0.0 {
            return Err(SimError::InvalidArg {
                what: "inspiratory pause time must not be negative",
            });
        }
        let t_e = params.expiratory_time();
        if t_e <= 0.0 {
            return Err(SimError::InvalidConfiguration {
                what: format!(
                    "expiratory time {t_e:.3} s is not positive (cycle {:.3} s, inspiration {} s, pause {} s)",
                    params.cycle_time(),
                    params.inspiratory_time,
                    params.pause_time
                ),
            });
        }
        Ok(params)
    }

    pub fn tidal_volume(&self) -> f64 {
        self.tidal_volume
    }

    pub fn peep(&self) -> f64 {
        self.peep
    }

    pub fn respiratory_rate(&self) -> f64 {
        self.respiratory_rate
    }

    pub fn inspiratory_time(&self) -> f64 {
        self.inspiratory_time
    }

    pub fn pause_time(&self) -> f64 {
        self.pause_time
    }

    /// One breath, in seconds.
    pub fn cycle_time(&self) -> f64 {
        1.0 / per_minute_to_hz(self.respiratory_rate)
    }

    pub fn expiratory_time(&self) -> f64 {
        self.cycle_time() - self.inspiratory_time - self.pause_time
    }

    /// Constant inspiratory flow in mL/s.
    pub fn inspiratory_flow(&self) -> f64 {
        self.tidal_volume / self.inspiratory_time
    }
}

impl Default for VentilatorParameters {
    fn default() -> Self {
        Self {
            tidal_volume: 350.0,
            peep: 5.0,
            respiratory_rate: 15.0,
            inspiratory_time: 1.0,
            pause_time: 0.25,
        }
    }
}
