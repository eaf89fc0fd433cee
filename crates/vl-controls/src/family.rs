//! Controller families and gain triples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Which terms of the PID law a controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerFamily {
    /// Proportional only.
    P,
    /// Proportional + integral.
    #[default]
    PI,
    /// Proportional + integral + derivative.
    PID,
}

impl ControllerFamily {
    pub const ALL: [ControllerFamily; 3] = [Self::P, Self::PI, Self::PID];

    pub fn uses_integral(self) -> bool {
        matches!(self, Self::PI | Self::PID)
    }

    pub fn uses_derivative(self) -> bool {
        matches!(self, Self::PID)
    }

    /// Zero the gains this family does not use.
    pub fn mask(self, gains: PidGains) -> PidGains {
        PidGains {
            kp: gains.kp,
            ki: if self.uses_integral() { gains.ki } else { 0.0 },
            kd: if self.uses_derivative() { gains.kd } else { 0.0 },
        }
    }

    /// Number of gains free for tuning (kp, then ki, then kd).
    pub fn free_gains(self) -> usize {
        match self {
            Self::P => 1,
            Self::PI => 2,
            Self::PID => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::P => "P",
            Self::PI => "PI",
            Self::PID => "PID",
        }
    }
}

impl fmt::Display for ControllerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerFamily {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P" => Ok(Self::P),
            "PI" => Ok(Self::PI),
            "PID" => Ok(Self::PID),
            _ => Err(ControlError::UnknownFamily {
                name: s.to_string(),
            }),
        }
    }
}

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.kp, self.ki, self.kd]
    }

    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

impl From<[f64; 3]> for PidGains {
    fn from(g: [f64; 3]) -> Self {
        Self::new(g[0], g[1], g[2])
    }
}

impl fmt::Display for PidGains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kp={:.6} Ki={:.6} Kd={:.6}", self.kp, self.ki, self.kd)
    }
}
