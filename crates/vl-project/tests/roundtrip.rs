use vl_controls::{BackendKind, ControllerFamily, PidGains};
use vl_project::schema::*;
use vl_project::{ProjectError, load_json, load_scenario, load_yaml, save_json, save_yaml, validate_scenario};
use vl_sim::{Phase, TrackedVariable};
use vl_tuning::OptimizationMethod;

fn scenario() -> Scenario {
    Scenario {
        version: SCHEMA_VERSION,
        name: "Roundtrip".to_string(),
        lung: LungDef {
            airway_resistance: 5.0,
            compliance: 45.0,
        },
        ventilator: VentilatorDef::default(),
        circuit: CircuitDef {
            patient: PatientDef::Custom {
                rp: 12e-3,
                c: 42.0,
                rl: 2.91,
            },
            blower: BlowerDef::default(),
        },
        simulation: SimulationDef {
            initial_phase: Phase::Inhale,
            initial_pressure_cmh2o: Some(6.0),
            ..SimulationDef::default()
        },
        setpoints: ScheduleDef {
            set_points: vec![5.0, 15.0, 10.0],
            intervals: vec![500, 500, 500],
        },
        controller: ControllerDef {
            backend: BackendKind::Continuous,
            tracked: TrackedVariable::Volume,
            error_formula: ErrorFormulaDef::DifferenceSquared,
            ..ControllerDef::default()
        },
        tuning: TuningDef::ZieglerNichols {
            family: ControllerFamily::PID,
        },
    }
}

#[test]
fn roundtrip_yaml() {
    let s = scenario();
    validate_scenario(&s).unwrap();

    let path = std::env::temp_dir().join("vl_project_roundtrip.yaml");
    save_yaml(&path, &s).unwrap();
    let loaded = load_yaml(&path).unwrap();
    assert_eq!(s, loaded);
}

#[test]
fn roundtrip_json() {
    let mut s = scenario();
    s.tuning = TuningDef::Fixed {
        gains: PidGains::new(0.5, 0.1, 0.01),
    };

    let path = std::env::temp_dir().join("vl_project_roundtrip.json");
    save_json(&path, &s).unwrap();
    let loaded = load_json(&path).unwrap();
    assert_eq!(s, loaded);
    assert_eq!(load_scenario(&path).unwrap(), s);
}

#[test]
fn minimal_yaml_takes_defaults() {
    let yaml = r#"
version: 1
name: Minimal
setpoints:
  set_points: [10.0]
  intervals: [300]
"#;
    let s: Scenario = serde_yaml::from_str(yaml).unwrap();
    validate_scenario(&s).unwrap();
    assert_eq!(s.lung, LungDef::default());
    assert_eq!(s.simulation.sample_frequency_hz, 30.0);
    assert_eq!(s.controller.dt, 1.0);
    assert_eq!(
        s.tuning,
        TuningDef::Optimize {
            method: OptimizationMethod::NelderMead,
            family: ControllerFamily::PI,
            initial: PidGains::new(1.0, 1.0, 0.0),
            minimizer: Default::default(),
        }
    );
}

#[test]
fn unknown_enum_names_are_rejected_when_parsing() {
    let yaml = r#"
version: 1
name: Bad
setpoints:
  set_points: [10.0]
  intervals: [300]
tuning:
  type: Optimize
  method: Simulated-Annealing
  initial: { kp: 1.0, ki: 1.0, kd: 0.0 }
"#;
    assert!(serde_yaml::from_str::<Scenario>(yaml).is_err());

    let yaml = r#"
version: 1
name: Bad
setpoints:
  set_points: [10.0]
  intervals: [300]
controller:
  integrator_min: -1.0
  integrator_max: 1.0
  tracked: temperature
"#;
    assert!(serde_yaml::from_str::<Scenario>(yaml).is_err());
}

#[test]
fn invalid_scenario_is_not_saved() {
    let mut s = scenario();
    s.ventilator.inspiratory_time_s = 4.0;
    let path = std::env::temp_dir().join("vl_project_invalid.yaml");
    let err = save_yaml(&path, &s).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
}

#[test]
fn unknown_extension_is_rejected() {
    let err = load_scenario(std::path::Path::new("scenario.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::UnknownFormat { .. }));
}
