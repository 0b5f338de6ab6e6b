//! Determinism verification tests
//!
//! Tests to ensure a ceremony produces identical histories given the same seed.

use ceremony_core::catalog::builtin;
use ceremony_core::{
    CeremonyDriver, CollapseCeremony, DecayCeremony, DecayConfig, HistoryLog, ManualClock,
    PhasePlan, PopulationConfig, ResonanceMap, SeededVariates, VariateSource,
};
use ceremony_core::resonance::Intention;
use ceremony_events::{AppliedEventRecord, ResolutionRecord};
use std::time::Duration;

fn plan() -> PhasePlan {
    PhasePlan {
        ambient: Duration::from_secs(3),
        active: Duration::from_secs(12),
        tick_interval: Duration::from_millis(50),
        phase_gap: Duration::from_secs(1),
    }
}

fn collapse_history(seed: u64) -> HistoryLog<ResolutionRecord> {
    let ceremony = CollapseCeremony::new(
        builtin::superposition().unwrap(),
        ResonanceMap::builtin(),
        Some(Intention::new("courage and change")),
        PopulationConfig {
            capacity: 6,
            arrival_rate: 2.0,
            collapse_probability: 0.05,
        },
        Duration::from_secs(3),
    )
    .unwrap();
    let mut driver =
        CeremonyDriver::new(ceremony, SeededVariates::from_seed(seed), ManualClock::new(), plan())
            .unwrap();
    driver.run().unwrap();
    driver.into_history()
}

fn decay_history(seed: u64) -> HistoryLog<AppliedEventRecord> {
    let ceremony = DecayCeremony::new(
        builtin::mist().unwrap(),
        builtin::shock().unwrap(),
        DecayConfig::default(),
    )
    .unwrap();
    let mut driver =
        CeremonyDriver::new(ceremony, SeededVariates::from_seed(seed), ManualClock::new(), plan())
            .unwrap();
    driver.run().unwrap();
    driver.into_history()
}

/// Test that the variate source produces identical sequences with the same seed
#[test]
fn test_variate_determinism() {
    let mut rng1 = SeededVariates::from_seed(42);
    let values1: Vec<f64> = (0..100).map(|_| rng1.unit()).collect();

    let mut rng2 = SeededVariates::from_seed(42);
    let values2: Vec<f64> = (0..100).map(|_| rng2.unit()).collect();

    assert_eq!(values1, values2, "Variate sequences should be identical with same seed");
}

/// Test that different seeds produce different sequences
#[test]
fn test_variate_different_seeds() {
    let mut rng1 = SeededVariates::from_seed(42);
    let mut rng2 = SeededVariates::from_seed(43);

    let values1: Vec<f64> = (0..10).map(|_| rng1.unit()).collect();
    let values2: Vec<f64> = (0..10).map(|_| rng2.unit()).collect();

    assert_ne!(values1, values2, "Different seeds should produce different sequences");
}

/// Test weighted selection determinism
#[test]
fn test_weighted_selection_determinism() {
    let weights = [0.1, 0.3, 0.4, 0.2];

    let mut rng1 = SeededVariates::from_seed(12345);
    let selections1: Vec<usize> = (0..100).map(|_| rng1.weighted_index(&weights).unwrap()).collect();

    let mut rng2 = SeededVariates::from_seed(12345);
    let selections2: Vec<usize> = (0..100).map(|_| rng2.weighted_index(&weights).unwrap()).collect();

    assert_eq!(selections1, selections2, "Weighted selections should be identical with same seed");
}

/// Test that a full collapse ceremony is reproducible
#[test]
fn test_collapse_ceremony_determinism() {
    let first = collapse_history(7);
    let second = collapse_history(7);

    assert!(!first.is_empty(), "Ceremony should resolve something");
    assert_eq!(first.records(), second.records());
}

/// Test that a full decay ceremony is reproducible
#[test]
fn test_decay_ceremony_determinism() {
    let first = decay_history(7);
    let second = decay_history(7);

    assert!(first.len() > 3, "Ceremony should apply perturbations before reliefs");
    assert_eq!(first.records(), second.records());
}

/// Test that the seed actually matters for a full ceremony
#[test]
fn test_ceremony_seed_sensitivity() {
    assert_ne!(decay_history(1).records(), decay_history(2).records());
}
