//! Query helpers for extracting data from loaded runs.

use serde::{Deserialize, Serialize};
use vl_results::TimeseriesRecord;

use crate::error::{AppError, AppResult};

/// Variables [`extract_series`] understands.
pub const SERIES_VARIABLES: [&str; 7] = [
    "flow",
    "volume",
    "pressure",
    "setpoint",
    "error",
    "accumulated_error",
    "action",
];

/// How well an episode tracked its setpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    pub samples: usize,
    pub time_range: (f64, f64),
    /// Integral of `|error|` over time.
    pub iae: f64,
    pub rms_error: f64,
    pub max_abs_error: f64,
    pub mean_pressure: f64,
}

pub fn tracking_summary(records: &[TimeseriesRecord]) -> AppResult<TrackingSummary> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(AppError::InvalidInput("No records in run".to_string())),
    };

    let n = records.len() as f64;
    let dt = if records.len() > 1 {
        (last.time - first.time) / (n - 1.0)
    } else {
        0.0
    };

    let abs_sum: f64 = records.iter().map(|r| r.error.abs()).sum();
    let sq_sum: f64 = records.iter().map(|r| r.error * r.error).sum();
    let max_abs_error = records.iter().map(|r| r.error.abs()).fold(0.0, f64::max);
    let mean_pressure = records.iter().map(|r| r.pressure).sum::<f64>() / n;

    Ok(TrackingSummary {
        samples: records.len(),
        time_range: (first.time, last.time),
        iae: abs_sum * dt,
        rms_error: (sq_sum / n).sqrt(),
        max_abs_error,
        mean_pressure,
    })
}

/// `(time, value)` pairs of one recorded variable.
pub fn extract_series(
    records: &[TimeseriesRecord],
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    let pick: fn(&TimeseriesRecord) -> f64 = match variable {
        "flow" => |r| r.flow,
        "volume" => |r| r.volume,
        "pressure" => |r| r.pressure,
        "setpoint" => |r| r.setpoint,
        "error" => |r| r.error,
        "accumulated_error" => |r| r.accumulated_error,
        "action" => |r| r.action,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unknown variable: {} (expected one of {})",
                variable,
                SERIES_VARIABLES.join(", ")
            )));
        }
    };
    Ok(records.iter().map(|r| (r.time, pick(r))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vl_sim::Phase;

    fn record(tick: u64, error: f64, pressure: f64) -> TimeseriesRecord {
        TimeseriesRecord {
            tick,
            time: tick as f64 * 0.5,
            phase: Phase::Exhale,
            setpoint: 10.0,
            flow: 0.0,
            volume: 0.0,
            pressure,
            error,
            accumulated_error: 0.0,
            action: -error,
        }
    }

    #[test]
    fn summary_statistics() {
        let records = [record(0, 3.0, 7.0), record(1, -4.0, 14.0), record(2, 0.0, 9.0)];
        let s = tracking_summary(&records).unwrap();
        assert_eq!(s.samples, 3);
        assert_eq!(s.time_range, (0.0, 1.0));
        assert!((s.iae - 7.0 * 0.5).abs() < 1e-12);
        assert!((s.rms_error - (25.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.max_abs_error, 4.0);
        assert!((s.mean_pressure - 10.0).abs() < 1e-12);
    }

    #[test]
    fn empty_run_has_no_summary() {
        assert!(tracking_summary(&[]).is_err());
    }

    #[test]
    fn series_by_name() {
        let records = [record(0, 3.0, 7.0), record(1, -4.0, 14.0)];
        assert_eq!(
            extract_series(&records, "pressure").unwrap(),
            vec![(0.0, 7.0), (0.5, 14.0)]
        );
        assert_eq!(
            extract_series(&records, "action").unwrap(),
            vec![(0.0, -3.0), (0.5, 4.0)]
        );
        assert!(extract_series(&records, "temperature").is_err());
    }
}
