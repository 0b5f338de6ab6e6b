//! Affect state and exponential decay for the continuous variant.
//!
//! A single scalar is pushed by perturbations and relaxes toward its baseline
//! between them: `current = (current - baseline) * rate + baseline`, applied
//! only while `current > baseline`. The number of decay applications is tied
//! to elapsed time, not to loop iterations.

use std::time::Duration;

use ceremony_events::{
    AppliedEventRecord, Category, CeremonyTimestamp, DecayMode, RELIEF_CATEGORY_ID,
};
use serde::{Deserialize, Serialize};

use crate::error::{CeremonyError, Result};
use crate::rng::VariateSource;

/// One step of the closing relief sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relief {
    pub name: String,
    /// Negative displacement applied to the state
    pub intensity: f64,
}

impl Relief {
    pub fn new(name: impl Into<String>, intensity: f64) -> Self {
        Self {
            name: name.into(),
            intensity,
        }
    }
}

/// Tuning for the continuous variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Calm resting value of the affect state
    pub baseline: f64,
    /// Per-application retention while ambient (mist)
    pub ambient_decay: f64,
    /// Per-application retention while active (shock)
    pub active_decay: f64,
    /// Decay applications per elapsed second
    pub decay_ticks_per_second: f64,
    /// Minimum |intensity| that gets announced
    pub shock_threshold: f64,
    /// Ambient perturbations per second
    pub ambient_rate: f64,
    /// Active perturbations per second
    pub active_rate: f64,
    /// Symmetric chaos spread for ambient perturbations
    pub ambient_chaos: f64,
    /// Downward chaos spread for active perturbations
    pub active_chaos: f64,
    /// Upward chaos spread as a multiple of `active_chaos`
    pub active_upward_skew: f64,
    /// Chance an active inter-arrival gap is stretched or squeezed
    pub burst_probability: f64,
    /// Gap multipliers picked uniformly when a burst happens
    pub burst_factors: Vec<f64>,
    /// Closing sequence, applied in order
    pub reliefs: Vec<Relief>,
    /// Pause before each relief
    pub relief_pause_secs: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            baseline: 1.0,
            ambient_decay: 0.98,
            active_decay: 0.95,
            decay_ticks_per_second: 20.0,
            shock_threshold: 0.02,
            ambient_rate: 2.5,
            active_rate: 0.5,
            ambient_chaos: 0.15,
            active_chaos: 0.5,
            active_upward_skew: 1.5,
            burst_probability: 0.12,
            burst_factors: vec![0.1, 3.5],
            reliefs: vec![
                Relief::new("Emerging Light", -0.18),
                Relief::new("Warming Rays", -0.32),
                Relief::new("Rainbow Serenity", -0.45),
            ],
            relief_pause_secs: 2.0,
        }
    }
}

impl DecayConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.baseline.is_finite() {
            return Err(CeremonyError::config("baseline must be finite"));
        }
        for (name, rate) in [
            ("ambient_decay", self.ambient_decay),
            ("active_decay", self.active_decay),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(CeremonyError::config(format!(
                    "{} must be within [0, 1), got {}",
                    name, rate
                )));
            }
        }
        for (name, value) in [
            ("decay_ticks_per_second", self.decay_ticks_per_second),
            ("shock_threshold", self.shock_threshold),
            ("ambient_rate", self.ambient_rate),
            ("active_rate", self.active_rate),
            ("active_upward_skew", self.active_upward_skew),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CeremonyError::config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        for (name, spread) in [
            ("ambient_chaos", self.ambient_chaos),
            ("active_chaos", self.active_chaos),
        ] {
            if !(0.0..=1.0).contains(&spread) {
                return Err(CeremonyError::config(format!(
                    "{} must be within [0, 1], got {}",
                    name, spread
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.burst_probability) {
            return Err(CeremonyError::config(format!(
                "burst_probability must be within [0, 1], got {}",
                self.burst_probability
            )));
        }
        if self.burst_probability > 0.0 && self.burst_factors.is_empty() {
            return Err(CeremonyError::config("burst_factors is empty"));
        }
        if let Some(bad) = self.burst_factors.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(CeremonyError::config(format!(
                "burst factor {} must be finite and > 0",
                bad
            )));
        }

        let mut previous = 0.0_f64;
        for relief in &self.reliefs {
            if !relief.intensity.is_finite() || relief.intensity >= 0.0 {
                return Err(CeremonyError::config(format!(
                    "relief '{}' must have a negative intensity, got {}",
                    relief.name, relief.intensity
                )));
            }
            if relief.intensity.abs() < previous {
                return Err(CeremonyError::config(format!(
                    "relief '{}' is gentler than the one before it",
                    relief.name
                )));
            }
            previous = relief.intensity.abs();
        }
        self.closing_duration()?;
        Ok(())
    }

    /// Retention factor for `mode`.
    pub fn decay_rate(&self, mode: DecayMode) -> f64 {
        match mode {
            DecayMode::Ambient => self.ambient_decay,
            DecayMode::Active => self.active_decay,
        }
    }

    /// Pause before each relief.
    pub fn relief_pause(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.relief_pause_secs).map_err(|_| {
            CeremonyError::config(format!(
                "relief_pause_secs must be finite and non-negative, got {}",
                self.relief_pause_secs
            ))
        })
    }

    /// One pause per relief plus a final one: `pause * (reliefs + 1)`.
    pub fn closing_duration(&self) -> Result<Duration> {
        let pause = self.relief_pause()?;
        u32::try_from(self.reliefs.len() + 1)
            .ok()
            .and_then(|steps| pause.checked_mul(steps))
            .ok_or_else(|| {
                CeremonyError::config(format!(
                    "relief_pause_secs {} is too long for {} reliefs",
                    self.relief_pause_secs,
                    self.reliefs.len()
                ))
            })
    }
}

/// The continuous scalar and its bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffectState {
    pub current: f64,
    pub baseline: f64,
    /// Sum of every displacement ever applied
    pub accumulated_displacement: f64,
}

impl AffectState {
    pub fn at_baseline(baseline: f64) -> Self {
        Self {
            current: baseline,
            baseline,
            accumulated_displacement: 0.0,
        }
    }

    /// Signed distance from baseline.
    pub fn displacement(&self) -> f64 {
        self.current - self.baseline
    }
}

/// Holds the affect state and applies perturbations and decay.
#[derive(Debug, Clone)]
pub struct DecayStateManager {
    config: DecayConfig,
    state: AffectState,
    /// Fractional decay applications carried between calls
    decay_carry: f64,
}

impl DecayStateManager {
    pub fn new(config: DecayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: AffectState::at_baseline(config.baseline),
            config,
            decay_carry: 0.0,
        })
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    pub fn state(&self) -> &AffectState {
        &self.state
    }

    pub fn current(&self) -> f64 {
        self.state.current
    }

    /// Returns true if an event of this intensity should be announced.
    pub fn is_triggered(&self, intensity: f64) -> bool {
        intensity.abs() >= self.config.shock_threshold
    }

    /// Multiplicative chaos for `mode`: symmetric and narrow while ambient,
    /// skewed upward while active.
    pub fn chaos_factor<R: VariateSource + ?Sized>(&self, mode: DecayMode, rng: &mut R) -> f64 {
        match mode {
            DecayMode::Ambient => {
                let u = self.config.ambient_chaos;
                1.0 + rng.uniform(-u, u)
            }
            DecayMode::Active => {
                let u = self.config.active_chaos;
                1.0 + rng.uniform(-u, u * self.config.active_upward_skew)
            }
        }
    }

    /// Samples an intensity from `category`, scales it by chaos and applies it.
    ///
    /// Returns the record and whether it crossed the shock threshold.
    pub fn apply_event<R: VariateSource + ?Sized>(
        &mut self,
        category: &Category,
        mode: DecayMode,
        now: CeremonyTimestamp,
        rng: &mut R,
    ) -> (AppliedEventRecord, bool) {
        let range = category.intensity_range;
        let nominal = rng.uniform(range.min, range.max);
        let chaos = self.chaos_factor(mode, rng);
        let record = self.displace(
            now,
            &category.id,
            &category.display_name,
            nominal * chaos,
            chaos,
            mode == DecayMode::Ambient,
        );
        let triggered = self.is_triggered(record.intensity);
        (record, triggered)
    }

    /// Applies one relief step. Draws nothing from the random engine.
    pub fn apply_relief(&mut self, relief: &Relief, now: CeremonyTimestamp) -> AppliedEventRecord {
        self.displace(now, RELIEF_CATEGORY_ID, &relief.name, relief.intensity, 1.0, false)
    }

    fn displace(
        &mut self,
        now: CeremonyTimestamp,
        category_id: &str,
        label: &str,
        intensity: f64,
        chaos_factor: f64,
        is_ambient: bool,
    ) -> AppliedEventRecord {
        let state_before = self.state.current;
        self.state.current += intensity;
        self.state.accumulated_displacement += intensity;

        AppliedEventRecord {
            timestamp: now,
            category_id: category_id.to_string(),
            label: label.to_string(),
            intensity,
            chaos_factor,
            state_before,
            state_after: self.state.current,
            is_ambient,
        }
    }

    /// One decay application. Only relaxes states above baseline and never
    /// overshoots; once float precision stalls the approach it snaps to
    /// baseline.
    pub fn decay_tick(&mut self, mode: DecayMode) {
        let baseline = self.state.baseline;
        if self.state.current <= baseline {
            return;
        }
        let next = (self.state.current - baseline) * self.config.decay_rate(mode) + baseline;
        self.state.current = if next < self.state.current { next.max(baseline) } else { baseline };
    }

    /// Applies as many decay ticks as `elapsed` is worth, carrying the
    /// fractional remainder to the next call. Returns the number applied.
    pub fn decay_for(&mut self, elapsed: Duration, mode: DecayMode) -> u64 {
        let owed = self.decay_carry + elapsed.as_secs_f64() * self.config.decay_ticks_per_second;
        let whole = owed.floor();
        self.decay_carry = owed - whole;

        let count = whole as u64;
        for _ in 0..count {
            if self.state.current <= self.state.baseline {
                break;
            }
            self.decay_tick(mode);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin;
    use crate::rng::{ScriptedVariates, SeededVariates};
    use ceremony_events::IntensityRange;

    fn manager() -> DecayStateManager {
        DecayStateManager::new(DecayConfig::default()).unwrap()
    }

    fn fixed(intensity: f64) -> Category {
        Category::new("fixed", "fixed", 1.0, IntensityRange::new(intensity, intensity))
    }

    #[test]
    fn test_apply_then_decay_once() {
        let config = DecayConfig {
            active_chaos: 0.0,
            ..DecayConfig::default()
        };
        let mut decay = DecayStateManager::new(config).unwrap();
        let mut rng = SeededVariates::from_seed(1);

        let (record, triggered) =
            decay.apply_event(&fixed(0.2), DecayMode::Active, CeremonyTimestamp::start(), &mut rng);
        assert!(triggered);
        assert!((record.state_after - 1.2).abs() < 1e-12);
        assert!((decay.current() - 1.2).abs() < 1e-12);

        decay.decay_tick(DecayMode::Active);
        assert!((decay.current() - 1.19).abs() < 1e-12);
    }

    #[test]
    fn test_decay_converges_without_overshoot() {
        for mode in [DecayMode::Ambient, DecayMode::Active] {
            let mut decay = manager();
            let mut rng = ScriptedVariates::constant(0.5);
            decay.apply_event(&fixed(0.35), mode, CeremonyTimestamp::start(), &mut rng);

            let mut previous = decay.current() - 1.0;
            let mut steps = 0;
            while decay.current() > 1.0 {
                decay.decay_tick(mode);
                let gap = decay.current() - 1.0;
                assert!(gap >= 0.0, "overshot baseline");
                assert!(gap < previous, "decay stalled at {}", gap);
                previous = gap;
                steps += 1;
                assert!(steps < 100_000);
            }
            assert_eq!(decay.current(), 1.0);
        }
    }

    #[test]
    fn test_decay_ignores_states_below_baseline() {
        let mut decay = manager();
        decay.apply_relief(&Relief::new("calm", -0.3), CeremonyTimestamp::start());
        let before = decay.current();
        decay.decay_tick(DecayMode::Active);
        assert_eq!(decay.current(), before);
    }

    #[test]
    fn test_decay_is_time_based() {
        let mut coarse = manager();
        let mut fine = manager();
        let mut rng = ScriptedVariates::constant(0.5);
        for d in [&mut coarse, &mut fine] {
            d.apply_event(&fixed(0.3), DecayMode::Active, CeremonyTimestamp::start(), &mut rng);
        }

        // One call covering a second vs. forty calls of 25ms each
        assert_eq!(coarse.decay_for(Duration::from_secs(1), DecayMode::Active), 20);
        let mut applied = 0;
        for _ in 0..40 {
            applied += fine.decay_for(Duration::from_millis(25), DecayMode::Active);
        }
        assert_eq!(applied, 20);
        assert!((coarse.current() - fine.current()).abs() < 1e-12);
    }

    #[test]
    fn test_chaos_spreads() {
        let decay = manager();
        let mut rng = SeededVariates::from_seed(4);
        for _ in 0..5_000 {
            let mist = decay.chaos_factor(DecayMode::Ambient, &mut rng);
            assert!((0.85..1.15).contains(&mist));
            let shock = decay.chaos_factor(DecayMode::Active, &mut rng);
            assert!((0.5..1.75).contains(&shock));
        }
    }

    #[test]
    fn test_nominal_draw_within_range() {
        let mut decay = manager();
        let catalog = builtin::shock().unwrap();
        let mut rng = SeededVariates::from_seed(77);
        for _ in 0..2_000 {
            let category = catalog.sample(&mut rng).unwrap().clone();
            let (record, _) =
                decay.apply_event(&category, DecayMode::Active, CeremonyTimestamp::start(), &mut rng);
            let nominal = record.nominal_intensity();
            let range = category.intensity_range;
            assert!(nominal >= range.min - 1e-12 && nominal <= range.max + 1e-12);
        }
    }

    #[test]
    fn test_sub_threshold_is_silent() {
        let mut decay = manager();
        let mut rng = ScriptedVariates::constant(0.5);
        let (record, triggered) = decay.apply_event(
            &fixed(0.005),
            DecayMode::Ambient,
            CeremonyTimestamp::start(),
            &mut rng,
        );
        assert!(!triggered);
        assert!(record.is_ambient);
        assert!(decay.current() > 1.0);
    }

    #[test]
    fn test_relief_accumulates() {
        let mut decay = manager();
        let reliefs = DecayConfig::default().reliefs;
        for relief in &reliefs {
            let record = decay.apply_relief(relief, CeremonyTimestamp::start());
            assert!(record.is_relief());
            assert_eq!(record.chaos_factor, 1.0);
        }
        assert!((decay.state().accumulated_displacement + 0.95).abs() < 1e-12);
        assert!((decay.state().displacement() + 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_config_validation() {
        let bad_rate = DecayConfig {
            active_decay: 1.0,
            ..DecayConfig::default()
        };
        assert!(DecayStateManager::new(bad_rate).is_err());

        let positive_relief = DecayConfig {
            reliefs: vec![Relief::new("wrong way", 0.2)],
            ..DecayConfig::default()
        };
        assert!(positive_relief.validate().is_err());

        let shrinking = DecayConfig {
            reliefs: vec![Relief::new("big", -0.4), Relief::new("small", -0.1)],
            ..DecayConfig::default()
        };
        assert!(shrinking.validate().is_err());

        let negative_pause = DecayConfig {
            relief_pause_secs: -2.0,
            ..DecayConfig::default()
        };
        assert!(negative_pause.validate().is_err());

        let negative_rate = DecayConfig {
            ambient_rate: -1.0,
            ..DecayConfig::default()
        };
        assert!(matches!(
            negative_rate.validate(),
            Err(CeremonyError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_oversized_relief_pause_rejected() {
        // Beyond what a Duration can hold at all
        let endless = DecayConfig {
            relief_pause_secs: 1e30,
            ..DecayConfig::default()
        };
        assert!(matches!(
            endless.validate(),
            Err(CeremonyError::InvalidConfiguration(_))
        ));

        // Fits once, but not four times
        let stacked = DecayConfig {
            relief_pause_secs: 5e18,
            ..DecayConfig::default()
        };
        assert!(stacked.relief_pause().is_ok());
        assert!(matches!(
            DecayStateManager::new(stacked),
            Err(CeremonyError::InvalidConfiguration(_))
        ));

        assert_eq!(
            DecayConfig::default().closing_duration().unwrap(),
            Duration::from_secs(8)
        );
    }
}
