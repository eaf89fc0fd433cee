//! Integration test: open-loop breathing with the default ventilator.
//!
//! 15 breaths/min, 1 s inspiration and 0.25 s pause sampled at 30 Hz:
//! - exhale 82 ticks, inhale 29 ticks, pause 7 ticks, 118 per breath
//! - inhale delivers a constant 21 L/min and fills the lung linearly
//! - pause holds volume and pressure
//! - exhale draws volume back down from the pause plateau

use proptest::prelude::*;
use vl_sim::{
    LungParameters, Phase, PlantConfig, PlantObservation, RespiratoryPlant, VentilatorParameters,
};

fn default_plant() -> RespiratoryPlant {
    RespiratoryPlant::new(
        LungParameters::default(),
        VentilatorParameters::default(),
        PlantConfig::default(),
    )
    .unwrap()
}

/// Run `n` ticks and return the phase each tick was computed in with its output.
fn trace(plant: &mut RespiratoryPlant, n: usize) -> Vec<(Phase, PlantObservation)> {
    (0..n)
        .map(|_| {
            let phase = plant.state().phase();
            (phase, plant.step(0.0))
        })
        .collect()
}

/// Lengths of consecutive runs of the same phase.
fn runs(phases: &[Phase]) -> Vec<(Phase, usize)> {
    let mut out: Vec<(Phase, usize)> = Vec::new();
    for &p in phases {
        match out.last_mut() {
            Some((last, n)) if *last == p => *n += 1,
            _ => out.push((p, 1)),
        }
    }
    out
}

#[test]
fn phase_cadence_is_periodic() {
    let mut plant = default_plant();
    let ticks = trace(&mut plant, 118 * 3);
    let phases: Vec<Phase> = ticks.iter().map(|(p, _)| *p).collect();

    let expected = [
        (Phase::Exhale, 82),
        (Phase::Inhale, 29),
        (Phase::Pause, 7),
    ];
    let r = runs(&phases);
    assert_eq!(r.len(), 9);
    for (k, run) in r.iter().enumerate() {
        assert_eq!(*run, expected[k % 3], "run {k}");
    }

    for (p, v) in [Phase::Exhale, Phase::Inhale, Phase::Pause]
        .into_iter()
        .zip([82, 29, 7])
    {
        assert_eq!(p.ticks(plant.ventilator(), plant.sample_frequency()), v);
    }
}

#[test]
fn first_breath_shape() {
    let mut plant = default_plant();
    let ticks = trace(&mut plant, 118 + 82);

    // lung at rest during the first exhale
    for (_, obs) in &ticks[..82] {
        assert_eq!(obs.volume, 0.0);
        assert_eq!(obs.pressure, 5.0);
    }

    // inhale: constant flow, linear fill, pressure rising
    let inhale = &ticks[82..111];
    for (k, (phase, obs)) in inhale.iter().enumerate() {
        assert_eq!(*phase, Phase::Inhale);
        assert!((obs.flow - 21.0).abs() < 1e-12);
        assert!((obs.volume - (k + 1) as f64 * 350.0 / 30.0).abs() < 1e-9);
    }
    for w in inhale.windows(2) {
        assert!(w[1].1.pressure > w[0].1.pressure);
    }
    // p = F R + V / C + PEEP
    let first = inhale[0].1;
    assert!((first.pressure - (1.05 + first.volume / 60.0 + 5.0)).abs() < 1e-12);

    // pause: flow stops, plateau holds
    let plateau = ticks[111].1;
    assert!((plateau.volume - 29.0 * 350.0 / 30.0).abs() < 1e-9);
    for (phase, obs) in &ticks[111..118] {
        assert_eq!(*phase, Phase::Pause);
        assert_eq!(obs.flow, 0.0);
        assert_eq!(*obs, plateau);
    }
    assert!((plateau.pressure - (plateau.volume / 60.0 + 5.0)).abs() < 1e-12);

    // exhale: net outflow from the plateau
    let exhale = &ticks[118..];
    assert!(exhale[0].1.flow < 0.0);
    assert!(exhale.iter().all(|(p, _)| *p == Phase::Exhale));
    let end = exhale.last().unwrap().1;
    assert!(end.volume < plateau.volume);
    assert!(end.pressure < plateau.pressure);
}

#[test]
fn stays_finite_over_many_breaths() {
    let mut plant = default_plant();
    for (_, obs) in trace(&mut plant, 118 * 20) {
        assert!(obs.is_finite());
    }
    assert_eq!(plant.state().tick(), 118 * 20);
}

proptest! {
    #[test]
    fn inhale_fills_at_prescribed_rate(
        tidal in 100.0_f64..800.0,
        t_i in 0.5_f64..1.5,
        fs in 20.0_f64..100.0,
        n in 1_usize..10,
    ) {
        let vent = VentilatorParameters::new(tidal, 5.0, 12.0, t_i, 0.2).unwrap();
        let mut plant = RespiratoryPlant::new(
            LungParameters::default(),
            vent,
            PlantConfig {
                sample_frequency: fs,
                initial_phase: Phase::Inhale,
                ..PlantConfig::default()
            },
        )
        .unwrap();
        // the first tick of an episode starts from an empty lung
        let start = plant.step(0.0).volume;
        prop_assert_eq!(start, 0.0);

        let n = n.min(Phase::Inhale.ticks(&vent, fs) as usize - 1);
        let mut last = start;
        for _ in 0..n {
            last = plant.step(0.0).volume;
        }
        let expected = vent.inspiratory_flow() * n as f64 / fs;
        prop_assert!((last - expected).abs() < 1e-9 * expected.max(1.0));
    }

    #[test]
    fn pause_keeps_volume(
        volume in 0.0_f64..1000.0,
        pause in 0.2_f64..1.0,
    ) {
        let vent = VentilatorParameters::new(350.0, 5.0, 12.0, 1.0, pause).unwrap();
        let mut plant = RespiratoryPlant::new(
            LungParameters::default(),
            vent,
            PlantConfig {
                initial_phase: Phase::Pause,
                initial_volume: volume,
                ..PlantConfig::default()
            },
        )
        .unwrap();
        for _ in 0..Phase::Pause.ticks(&vent, 30.0) {
            let obs = plant.step(0.0);
            prop_assert_eq!(obs.volume, volume);
            prop_assert_eq!(obs.flow, 0.0);
        }
    }
}
