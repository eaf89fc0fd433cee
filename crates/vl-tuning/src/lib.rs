//! Offline PID tuning against a linearised plant.
//!
//! Two independent strategies produce a [`PidGains`] triple:
//! - [`ReactionCurveTuner`]: Ziegler-Nichols from the open-loop step response.
//! - [`OptimizationTuner`]: numerical search minimising closed-loop step error.
//!
//! [`tune`] is the single entry point used by the application layer.

pub mod error;
pub mod minimize;
pub mod optimize;
pub mod reaction_curve;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vl_controls::{ControllerFamily, PidGains, TransferFunction};

pub use error::{TuningError, TuningResult};
pub use minimize::{Minimum, MinimizerConfig, OptimizationMethod, TerminationStatus, minimize};
pub use optimize::{OptimizationReport, OptimizationTuner, StepTrackingObjective};
pub use reaction_curve::{
    ReactionCurve, ReactionCurveAnalysis, ReactionCurveTuner, analyze_step_response,
    ziegler_nichols_gains,
};

/// How gains are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningMethod {
    ZieglerNichols,
    Optimize(OptimizationMethod),
}

impl Default for TuningMethod {
    fn default() -> Self {
        Self::Optimize(OptimizationMethod::default())
    }
}

impl fmt::Display for TuningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZieglerNichols => f.write_str("ZN"),
            Self::Optimize(m) => write!(f, "{m}"),
        }
    }
}

impl FromStr for TuningMethod {
    type Err = TuningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zn" | "ziegler-nichols" | "ziegler_nichols" => Ok(Self::ZieglerNichols),
            _ => s.parse().map(Self::Optimize),
        }
    }
}

/// Gains plus whatever the chosen method reports about how it found them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub family: ControllerFamily,
    pub method: TuningMethod,
    pub gains: PidGains,
    pub reaction_curve: Option<ReactionCurveAnalysis>,
    pub report: Option<OptimizationReport>,
}

/// Tune `family` against `plant`. `initial` seeds the optimizers and is
/// ignored by Ziegler-Nichols.
pub fn tune(
    plant: &TransferFunction,
    method: TuningMethod,
    family: ControllerFamily,
    initial: PidGains,
    config: &MinimizerConfig,
) -> TuningResult<TuningOutcome> {
    match method {
        TuningMethod::ZieglerNichols => {
            let (gains, analysis) = ReactionCurveTuner::new().tune(plant, family)?;
            Ok(TuningOutcome {
                family,
                method,
                gains,
                reaction_curve: Some(analysis),
                report: None,
            })
        }
        TuningMethod::Optimize(m) => {
            let report = OptimizationTuner::new(m)
                .with_config(*config)
                .tune(plant, family, initial)?;
            Ok(TuningOutcome {
                family,
                method,
                gains: report.gains,
                reaction_curve: None,
                report: Some(report),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tuning_methods() {
        assert_eq!("ZN".parse::<TuningMethod>().unwrap(), TuningMethod::ZieglerNichols);
        assert_eq!(
            "BFGS".parse::<TuningMethod>().unwrap(),
            TuningMethod::Optimize(OptimizationMethod::Bfgs)
        );
        assert_eq!(
            "nelder-mead".parse::<TuningMethod>().unwrap(),
            TuningMethod::Optimize(OptimizationMethod::NelderMead)
        );
        assert!("genetic".parse::<TuningMethod>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for m in [
            TuningMethod::ZieglerNichols,
            TuningMethod::Optimize(OptimizationMethod::NelderMead),
            TuningMethod::Optimize(OptimizationMethod::Bfgs),
        ] {
            assert_eq!(m.to_string().parse::<TuningMethod>().unwrap(), m);
        }
    }
}
