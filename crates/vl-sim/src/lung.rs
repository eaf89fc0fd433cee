//! Lumped lung mechanics.

use vl_core::{ensure_positive, per_l_per_s_to_per_ml_per_s};

use crate::error::SimResult;

/// Airway resistance and respiratory-system compliance.
///
/// Resistance is quoted in cmH2O/(L/s) and converted to cmH2O/(mL/s) once,
/// here, so every equation downstream works in millilitres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LungParameters {
    airway_resistance: f64,
    airway_resistance_ml: f64,
    compliance: f64,
}

impl LungParameters {
    /// `r_aw` in cmH2O/(L/s), `c_rs` in mL/cmH2O. Both must be positive.
    pub fn new(r_aw: f64, c_rs: f64) -> SimResult<Self> {
        let r_aw = ensure_positive(r_aw, "airway resistance must be positive")?;
        let c_rs = ensure_positive(c_rs, "compliance must be positive")?;
        Ok(Self {
            airway_resistance: r_aw,
            airway_resistance_ml: per_l_per_s_to_per_ml_per_s(r_aw),
            compliance: c_rs,
        })
    }

    /// cmH2O/(L/s), as configured.
    pub fn airway_resistance(&self) -> f64 {
        self.airway_resistance
    }

    /// cmH2O/(mL/s).
    pub fn airway_resistance_ml(&self) -> f64 {
        self.airway_resistance_ml
    }

    /// mL/cmH2O.
    pub fn compliance(&self) -> f64 {
        self.compliance
    }

    /// Passive expiratory time constant `R C` in seconds.
    pub fn time_constant(&self) -> f64 {
        self.airway_resistance_ml * self.compliance
    }
}

impl Default for LungParameters {
    fn default() -> Self {
        Self {
            airway_resistance: 3.0,
            airway_resistance_ml: per_l_per_s_to_per_ml_per_s(3.0),
            compliance: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resistance_is_converted_at_construction() {
        let lung = LungParameters::new(3.0, 60.0).unwrap();
        assert_eq!(lung.airway_resistance(), 3.0);
        assert_eq!(lung.airway_resistance_ml(), 0.003);
        assert!((lung.time_constant() - 0.18).abs() < 1e-12);
        assert_eq!(lung, LungParameters::default());
    }

    #[test]
    fn zero_resistance_is_rejected() {
        assert!(LungParameters::new(0.0, 60.0).is_err());
        assert!(LungParameters::new(3.0, -1.0).is_err());
        assert!(LungParameters::new(f64::NAN, 60.0).is_err());
    }
}
