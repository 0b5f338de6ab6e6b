//! End-to-end ceremony tests.
//!
//! Whole runs under a manual clock, observed through the presentation seam.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use ceremony_core::catalog::builtin;
use ceremony_core::export::write_jsonl;
use ceremony_core::{
    CeremonyConfig, CeremonyDriver, CeremonyObserver, CollapseCeremony, DecayCeremony,
    DecayConfig, ManualClock, PhasePlan, PopulationConfig, PresentResult, PresentationError,
    ResonanceMap, SeededVariates,
};
use ceremony_events::{AppliedEventRecord, Entity, ResolutionRecord};
use tempfile::tempdir;

fn plan(ambient: u64, active: u64) -> PhasePlan {
    PhasePlan {
        ambient: Duration::from_secs(ambient),
        active: Duration::from_secs(active),
        tick_interval: Duration::from_millis(50),
        phase_gap: Duration::ZERO,
    }
}

/// Tracks the live population as seen by a renderer.
#[derive(Clone, Default)]
struct PopulationWatch {
    live: Rc<RefCell<i64>>,
    peak: Rc<RefCell<i64>>,
}

impl CeremonyObserver for PopulationWatch {
    fn on_arrival(&mut self, _entity: &Entity) -> PresentResult {
        let mut live = self.live.borrow_mut();
        *live += 1;
        let mut peak = self.peak.borrow_mut();
        *peak = (*peak).max(*live);
        Ok(())
    }

    fn on_resolution(&mut self, _record: &ResolutionRecord) -> PresentResult {
        *self.live.borrow_mut() -= 1;
        Ok(())
    }
}

/// Fails every event callback.
struct BrokenSpeaker;

impl CeremonyObserver for BrokenSpeaker {
    fn on_ambient_event(&mut self, _record: &AppliedEventRecord) -> PresentResult {
        Err(PresentationError::Unavailable("no audio device".to_string()))
    }

    fn on_shock_event(&mut self, _record: &AppliedEventRecord, _triggered: bool) -> PresentResult {
        Err(PresentationError::Unavailable("no audio device".to_string()))
    }

    fn on_relief(&mut self, _record: &AppliedEventRecord) -> PresentResult {
        Err(PresentationError::Unavailable("no audio device".to_string()))
    }
}

fn decay_ceremony() -> DecayCeremony {
    DecayCeremony::new(
        builtin::mist().unwrap(),
        builtin::shock().unwrap(),
        DecayConfig::default(),
    )
    .unwrap()
}

#[test]
fn test_population_never_exceeds_capacity() {
    let watch = PopulationWatch::default();
    let ceremony = CollapseCeremony::new(
        builtin::superposition().unwrap(),
        ResonanceMap::builtin(),
        None,
        PopulationConfig {
            capacity: 4,
            arrival_rate: 50.0,
            collapse_probability: 0.02,
        },
        Duration::from_secs(5),
    )
    .unwrap();
    let mut driver =
        CeremonyDriver::new(ceremony, SeededVariates::from_seed(3), ManualClock::new(), plan(5, 20))
            .unwrap()
            .with_observer(Box::new(watch.clone()));
    driver.run().unwrap();

    assert!(*watch.peak.borrow() <= 4);
    assert_eq!(*watch.peak.borrow(), 4, "High arrival rate should fill the pool");

    let summary = driver.summary();
    assert_eq!(summary.active_remaining as i64, *watch.live.borrow());
    assert_eq!(summary.arrivals, summary.resolutions + summary.active_remaining);
    assert_eq!(summary.total_count, summary.resolutions);
    assert_eq!(summary.unresolved.len(), summary.active_remaining);
}

#[test]
fn test_full_pool_that_never_collapses() {
    let ceremony = CollapseCeremony::new(
        builtin::superposition().unwrap(),
        ResonanceMap::builtin(),
        None,
        PopulationConfig {
            capacity: 1,
            arrival_rate: f64::INFINITY,
            collapse_probability: 0.0,
        },
        Duration::from_secs(2),
    )
    .unwrap();
    let mut driver =
        CeremonyDriver::new(ceremony, SeededVariates::from_seed(0), ManualClock::new(), plan(1, 3))
            .unwrap();
    driver.run().unwrap();

    assert!(driver.history().is_empty());
    let summary = driver.summary();
    assert_eq!(summary.active_remaining, 1);
    assert_eq!(summary.arrivals, 1);
    assert!(summary.top_records.is_empty());
}

#[test]
fn test_echoes_need_an_intention() {
    let ceremony = CollapseCeremony::new(
        builtin::superposition().unwrap(),
        ResonanceMap::builtin(),
        None,
        PopulationConfig {
            capacity: 8,
            arrival_rate: 4.0,
            collapse_probability: 0.2,
        },
        Duration::from_secs(2),
    )
    .unwrap();
    let mut driver =
        CeremonyDriver::new(ceremony, SeededVariates::from_seed(21), ManualClock::new(), plan(0, 10))
            .unwrap();
    driver.run().unwrap();

    assert!(!driver.history().is_empty());
    assert_eq!(driver.summary().echoed, 0);
}

#[test]
fn test_broken_presentation_never_stops_the_ceremony() {
    let mut quiet = CeremonyDriver::new(
        decay_ceremony(),
        SeededVariates::from_seed(8),
        ManualClock::new(),
        plan(2, 6),
    )
    .unwrap();
    quiet.run().unwrap();

    let mut broken = CeremonyDriver::new(
        decay_ceremony(),
        SeededVariates::from_seed(8),
        ManualClock::new(),
        plan(2, 6),
    )
    .unwrap()
    .with_observer(Box::new(BrokenSpeaker));
    broken.run().unwrap();

    assert_eq!(quiet.history().records(), broken.history().records());
    assert_eq!(broken.presentation_failures(), broken.history().len());
    assert_eq!(broken.summary().run.presentation_failures, broken.history().len());
    assert_eq!(quiet.presentation_failures(), 0);
}

#[test]
fn test_decay_summary_is_consistent() {
    let mut driver = CeremonyDriver::new(
        decay_ceremony(),
        SeededVariates::from_seed(99),
        ManualClock::new(),
        plan(4, 30),
    )
    .unwrap()
    .with_top_n(3);
    driver.run().unwrap();

    let summary = driver.summary();
    assert_eq!(
        summary.total_count,
        summary.ambient_events + summary.active_events + summary.relief_events
    );
    assert_eq!(summary.relief_events, 3);
    assert!(summary.announced_events <= summary.active_events);
    assert!(summary.top_records.len() <= 3);
    assert!(summary.most_relieving.iter().all(|r| r.intensity < 0.0));
    assert!(summary.most_intense.iter().all(|r| r.intensity > 0.0 && !r.is_ambient));
    for capped in &summary.capped {
        assert!(capped.occurrences <= capped.max);
    }

    let net: f64 = driver.history().iter().map(|r| r.intensity).sum();
    assert!((summary.net_accumulation - net).abs() < 1e-9);
    assert!((summary.displacement - (summary.final_state - summary.baseline)).abs() < 1e-12);

    let percent: f64 = summary.distribution.iter().map(|c| c.percent).sum();
    assert!((percent - 100.0).abs() < 1e-6);
}

#[test]
fn test_configured_ceremony_exports_history() {
    let toml = r#"
        [ceremony]
        variant = "collapse"
        seed = 5
        ambient_secs = 2.0
        active_secs = 8.0
        closing_secs = 2.0
        phase_gap_secs = 0.5
        intention = "luck and choice"

        [population]
        capacity = 5
        arrival_rate = 3.0
        collapse_probability = 0.1
    "#;
    let config = CeremonyConfig::from_str(toml).unwrap();
    config.validate().unwrap();

    let mut driver = CeremonyDriver::new(
        config.collapse_ceremony().unwrap(),
        config.variates(),
        ManualClock::new(),
        config.plan().unwrap(),
    )
    .unwrap();
    driver.run().unwrap();
    assert!(!driver.history().is_empty());
    assert_eq!(driver.summary().intention.as_deref(), Some("luck and choice"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("history.jsonl");
    let written = write_jsonl(driver.history(), &path).unwrap();
    assert_eq!(written as usize, driver.history().len());

    let content = fs::read_to_string(&path).unwrap();
    let parsed: Vec<ResolutionRecord> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed, driver.history().records());
    for record in &parsed {
        assert_ne!(record.chosen_outcome, record.rejected_outcome);
    }
}

#[test]
fn test_summary_serializes() {
    let mut driver = CeremonyDriver::new(
        decay_ceremony(),
        SeededVariates::from_seed(4),
        ManualClock::new(),
        plan(1, 3),
    )
    .unwrap();
    driver.run().unwrap();

    let json = serde_json::to_value(driver.summary()).unwrap();
    assert_eq!(json["variant"], "decay");
    assert_eq!(json["relief_events"], 3);
    assert!(json["distribution"].is_array());
}
