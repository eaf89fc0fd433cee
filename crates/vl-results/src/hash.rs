//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};
use vl_project::Scenario;

/// Episodes are deterministic, so the scenario plus the engine version fully
/// identify a run.
pub fn compute_run_id(scenario: &Scenario, engine_version: &str) -> String {
    let mut hasher = Sha256::new();

    let scenario_json = serde_json::to_string(scenario).unwrap_or_default();
    hasher.update(scenario_json.as_bytes());
    hasher.update(engine_version.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vl_project::schema::*;

    fn scenario(name: &str) -> Scenario {
        Scenario {
            version: SCHEMA_VERSION,
            name: name.to_string(),
            lung: LungDef::default(),
            ventilator: VentilatorDef::default(),
            circuit: CircuitDef::default(),
            simulation: SimulationDef::default(),
            setpoints: ScheduleDef {
                set_points: vec![10.0],
                intervals: vec![100],
            },
            controller: ControllerDef::default(),
            tuning: TuningDef::default(),
        }
    }

    #[test]
    fn hash_stability() {
        let s = scenario("a");
        assert_eq!(compute_run_id(&s, "v1"), compute_run_id(&s, "v1"));
        assert_eq!(compute_run_id(&s, "v1").len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let a = scenario("a");
        let mut b = scenario("a");
        b.setpoints.set_points[0] = 11.0;

        assert_ne!(compute_run_id(&a, "v1"), compute_run_id(&b, "v1"));
        assert_ne!(compute_run_id(&a, "v1"), compute_run_id(&a, "v2"));
    }
}
