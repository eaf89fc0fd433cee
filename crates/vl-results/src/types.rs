//! Result data types.

use serde::{Deserialize, Serialize};
use vl_controls::PidGains;
use vl_tuning::TuningOutcome;

pub type RunId = String;

/// One stored time series line.
pub type TimeseriesRecord = vl_sim::EpisodeSample;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub scenario_name: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub engine_version: String,
    /// Label of the patient the episode ran against.
    pub patient: String,
    pub sample_frequency_hz: f64,
    pub steps: usize,
    pub gains: PidGains,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<TuningOutcome>,
}
