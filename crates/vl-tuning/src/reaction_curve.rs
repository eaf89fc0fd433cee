//! Ziegler-Nichols reaction-curve tuning.
//!
//! The open-loop unit-step response is differentiated twice; the first sign
//! change of the second derivative marks the inflection point. The tangent
//! there crosses `y = 0` at the apparent dead time `L` and `y = h` (the
//! response peak) at `L + T`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vl_controls::{
    ControllerFamily, PidGains, TimeGrid, TransferFunction, default_step_grid, peak,
    step_response,
};
use vl_core::{gradient, signum0};

use crate::error::{TuningError, TuningResult};

/// Apparent dead time `L` and time constant `T` of a reaction curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionCurve {
    pub dead_time: f64,
    pub time_constant: f64,
}

/// Ziegler-Nichols open-loop table.
///
/// | family | Kp        | Ki       | Kd      |
/// |--------|-----------|----------|---------|
/// | P      | T/L       | 0        | 0       |
/// | PI     | 0.9 T/L   | L/0.3    | 0       |
/// | PID    | 1.2 T/L   | 2 L      | 0.5 L   |
///
/// The integral and derivative entries are the table's time values used
/// directly as gains.
pub fn ziegler_nichols_gains(family: ControllerFamily, curve: ReactionCurve) -> TuningResult<PidGains> {
    let ReactionCurve {
        dead_time: l,
        time_constant: t,
    } = curve;
    if !(l.is_finite() && l > 0.0) {
        return Err(TuningError::DegenerateCurve {
            what: format!("dead time must be positive, got {l}"),
        });
    }
    if !t.is_finite() {
        return Err(TuningError::DegenerateCurve {
            what: format!("time constant is not finite ({t})"),
        });
    }

    Ok(match family {
        ControllerFamily::P => PidGains::new(t / l, 0.0, 0.0),
        ControllerFamily::PI => PidGains::new(0.9 * t / l, l / 0.3, 0.0),
        ControllerFamily::PID => PidGains::new(1.2 * t / l, 2.0 * l, 0.5 * l),
    })
}

/// Everything the tangent construction found; enough to redraw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionCurveAnalysis {
    pub inflection_index: usize,
    pub inflection_time: f64,
    pub inflection_value: f64,
    pub slope: f64,
    /// Response peak `h`.
    pub peak: f64,
    pub dead_time: f64,
    pub time_constant: f64,
}

impl ReactionCurveAnalysis {
    pub fn curve(&self) -> ReactionCurve {
        ReactionCurve {
            dead_time: self.dead_time,
            time_constant: self.time_constant,
        }
    }

    /// Tangent line through the inflection point.
    pub fn tangent(&self, t: f64) -> f64 {
        self.inflection_value + self.slope * (t - self.inflection_time)
    }
}

/// Locate the inflection tangent of a sampled step response.
pub fn analyze_step_response(t: &[f64], y: &[f64]) -> TuningResult<ReactionCurveAnalysis> {
    let dy = gradient(y, t)?;
    let d2y = gradient(&dy, t)?;

    let index = d2y
        .windows(2)
        .position(|w| signum0(w[0]) != signum0(w[1]))
        .ok_or(TuningError::NoInflection)?;

    let inflection_time = t[index];
    let inflection_value = y[index];
    let slope = dy[index];
    if slope == 0.0 || !slope.is_finite() {
        return Err(TuningError::ZeroSlope {
            time: inflection_time,
        });
    }

    let h = peak(y);
    let dead_time = inflection_time - inflection_value / slope;
    let time_constant = inflection_time + (h - inflection_value) / slope - dead_time;

    debug!(
        index,
        inflection_time, inflection_value, slope, peak = h, dead_time, time_constant,
        "reaction curve tangent"
    );

    Ok(ReactionCurveAnalysis {
        inflection_index: index,
        inflection_time,
        inflection_value,
        slope,
        peak: h,
        dead_time,
        time_constant,
    })
}

/// Reaction-curve tuner over a transfer-function plant.
#[derive(Debug, Clone, Default)]
pub struct ReactionCurveTuner {
    grid: Option<TimeGrid>,
}

impl ReactionCurveTuner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the step response on `grid` instead of the pole-derived default.
    pub fn with_grid(mut self, grid: TimeGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn analyze(&self, plant: &TransferFunction) -> TuningResult<ReactionCurveAnalysis> {
        let sys = plant.to_state_space();
        let grid = match &self.grid {
            Some(grid) => grid.clone(),
            None => default_step_grid(&sys)?,
        };
        let response = step_response(&sys, &grid)?;
        analyze_step_response(&response.t, &response.y)
    }

    pub fn tune(
        &self,
        plant: &TransferFunction,
        family: ControllerFamily,
    ) -> TuningResult<(PidGains, ReactionCurveAnalysis)> {
        let analysis = self.analyze(plant)?;
        let gains = ziegler_nichols_gains(family, analysis.curve())?;
        info!(%family, %gains, l = analysis.dead_time, t = analysis.time_constant, "Ziegler-Nichols gains");
        Ok((gains, analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(l: f64, t: f64) -> ReactionCurve {
        ReactionCurve {
            dead_time: l,
            time_constant: t,
        }
    }

    #[test]
    fn table_pi_for_unit_dead_time() {
        let g = ziegler_nichols_gains(ControllerFamily::PI, curve(1.0, 4.0)).unwrap();
        assert!((g.kp - 3.6).abs() < 1e-12);
        assert!((g.ki - 1.0 / 0.3).abs() < 1e-12);
        assert_eq!(g.kd, 0.0);
    }

    #[test]
    fn table_p_and_pid() {
        let p = ziegler_nichols_gains(ControllerFamily::P, curve(2.0, 4.0)).unwrap();
        assert_eq!(p, PidGains::new(2.0, 0.0, 0.0));

        let pid = ziegler_nichols_gains(ControllerFamily::PID, curve(2.0, 4.0)).unwrap();
        assert!((pid.kp - 2.4).abs() < 1e-12);
        assert_eq!(pid.ki, 4.0);
        assert_eq!(pid.kd, 1.0);
    }

    #[test]
    fn non_positive_dead_time_is_degenerate() {
        assert!(matches!(
            ziegler_nichols_gains(ControllerFamily::PI, curve(0.0, 4.0)),
            Err(TuningError::DegenerateCurve { .. })
        ));
        assert!(ziegler_nichols_gains(ControllerFamily::PI, curve(-0.5, 4.0)).is_err());
    }

    #[test]
    fn concave_response_has_no_inflection() {
        let t = vl_core::linspace(0.0, 7.0, 101);
        let y: Vec<f64> = t.iter().map(|t| 1.0 - (-t).exp()).collect();
        assert_eq!(analyze_step_response(&t, &y), Err(TuningError::NoInflection));
    }

    #[test]
    fn tangent_of_synthetic_s_curve() {
        // piecewise: convex parabola up to t = 1, then straight line of slope 2
        let t = vl_core::linspace(0.0, 4.0, 401);
        let y: Vec<f64> = t
            .iter()
            .map(|&t| if t <= 1.0 { t * t } else { 1.0 + 2.0 * (t - 1.0) })
            .collect();
        let a = analyze_step_response(&t, &y).unwrap();
        assert!((a.slope - 2.0).abs() < 0.05);
        // line y = 2t - 1 crosses zero at 0.5
        assert!((a.dead_time - 0.5).abs() < 0.05);
        assert!((a.tangent(a.inflection_time) - a.inflection_value).abs() < 1e-12);
        assert_eq!(a.peak, 7.0);
    }

    #[test]
    fn flat_response_reports_zero_slope() {
        let t = vl_core::linspace(0.0, 1.0, 11);
        // concavity flips ahead of the bump, where the curve is still flat
        let mut y = vec![0.0; 11];
        y[5] = 1.0;
        let err = analyze_step_response(&t, &y);
        assert!(matches!(err, Err(TuningError::ZeroSlope { .. })));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn table_follows_closed_form(
            l in 0.01_f64..10.0,
            t in 0.01_f64..100.0,
        ) {
            let c = ReactionCurve { dead_time: l, time_constant: t };
            let tol = 1e-12 * (1.0 + t / l);

            let p = ziegler_nichols_gains(ControllerFamily::P, c).unwrap();
            prop_assert!((p.kp - t / l).abs() <= tol);
            prop_assert_eq!((p.ki, p.kd), (0.0, 0.0));

            let pi = ziegler_nichols_gains(ControllerFamily::PI, c).unwrap();
            prop_assert!((pi.kp - 0.9 * t / l).abs() <= tol);
            prop_assert!((pi.ki - l / 0.3).abs() <= 1e-12 * (1.0 + l));
            prop_assert_eq!(pi.kd, 0.0);

            let pid = ziegler_nichols_gains(ControllerFamily::PID, c).unwrap();
            prop_assert!((pid.kp - 1.2 * t / l).abs() <= tol);
            prop_assert!((pid.ki - 2.0 * l).abs() <= 1e-12 * (1.0 + l));
            prop_assert!((pid.kd - 0.5 * l).abs() <= 1e-12 * (1.0 + l));
        }
    }
}
