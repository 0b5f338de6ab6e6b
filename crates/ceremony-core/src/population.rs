//! Population manager for the discrete variant.
//!
//! Holds the bounded set of unresolved superpositions. Every tick is a pair
//! of independent Bernoulli trials: one for a new arrival (probability
//! `arrival_rate * dt`, dt measured since the last successful arrival) and one
//! per active entity for collapse. Nothing guarantees an entity ever
//! collapses; leftovers at run end are an expected terminal state.

use std::time::Duration;

use ceremony_events::{CeremonyTimestamp, Entity, EntityId, ResolutionRecord};
use serde::{Deserialize, Serialize};

use crate::catalog::{EventCatalog, OccurrenceQuota};
use crate::error::{CeremonyError, Result};
use crate::resonance::{Intention, ResonanceMap};
use crate::rng::VariateSource;

/// Population tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Maximum number of simultaneously unresolved entities
    pub capacity: usize,
    /// Expected arrivals per second; `inf` arrives on every tick
    pub arrival_rate: f64,
    /// Per-tick collapse probability for each active entity
    pub collapse_probability: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            capacity: 12,
            arrival_rate: 1.2,
            collapse_probability: 0.03,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.arrival_rate.is_nan() || self.arrival_rate < 0.0 {
            return Err(CeremonyError::config(format!(
                "arrival_rate must be non-negative, got {}",
                self.arrival_rate
            )));
        }
        if !self.collapse_probability.is_finite()
            || !(0.0..=1.0).contains(&self.collapse_probability)
        {
            return Err(CeremonyError::config(format!(
                "collapse_probability must be within [0, 1], got {}",
                self.collapse_probability
            )));
        }
        Ok(())
    }
}

/// Everything that happened during one population tick.
#[derive(Debug, Clone, Default)]
pub struct PopulationTick {
    pub arrival: Option<Entity>,
    pub resolutions: Vec<ResolutionRecord>,
}

/// Owns the active superpositions.
#[derive(Debug, Clone)]
pub struct PopulationManager {
    config: PopulationConfig,
    active: Vec<Entity>,
    since_last_arrival: Duration,
    next_id: u64,
    arrivals: usize,
    resolutions: usize,
}

impl PopulationManager {
    /// Creates an empty pool, failing fast on invalid configuration.
    pub fn new(config: PopulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            active: Vec::new(),
            since_last_arrival: Duration::ZERO,
            next_id: 1,
            arrivals: 0,
            resolutions: 0,
        })
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn active(&self) -> &[Entity] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_full(&self) -> bool {
        self.active.len() >= self.config.capacity
    }

    pub fn total_arrivals(&self) -> usize {
        self.arrivals
    }

    pub fn total_resolutions(&self) -> usize {
        self.resolutions
    }

    /// Arrival trial for `dt` more seconds of waiting.
    ///
    /// On success (and spare capacity) a new entity is sampled from
    /// `catalog` and the arrival clock resets.
    pub fn try_arrive<R: VariateSource + ?Sized>(
        &mut self,
        dt: Duration,
        now: CeremonyTimestamp,
        catalog: &EventCatalog,
        quota: &mut OccurrenceQuota,
        rng: &mut R,
    ) -> Result<Option<Entity>> {
        self.since_last_arrival += dt;

        let arrives = if self.config.arrival_rate.is_infinite() {
            true
        } else {
            let p = self.config.arrival_rate * self.since_last_arrival.as_secs_f64();
            rng.chance(p)
        };
        if !arrives || self.is_full() {
            return Ok(None);
        }

        let template = quota.sample(catalog, rng)?;
        let outcomes = template.outcomes.clone().ok_or_else(|| {
            CeremonyError::config(format!("template '{}' has no outcome pair", template.id))
        })?;
        let range = template.intensity_range;
        let intensity = rng.uniform(range.min, range.max);

        let entity = Entity {
            id: EntityId(self.next_id),
            category_id: template.id.clone(),
            label: template.display_name.clone(),
            outcomes,
            intensity,
            created_at: now,
        };
        self.next_id += 1;
        self.arrivals += 1;
        self.since_last_arrival = Duration::ZERO;
        self.active.push(entity.clone());

        tracing::debug!(
            entity = %entity.id,
            category = %entity.category_id,
            intensity = entity.intensity,
            active = self.active.len(),
            "superposition arrived"
        );
        Ok(Some(entity))
    }

    /// Collapse trial for every active entity.
    ///
    /// Each collapsed entity leaves the pool and yields exactly one record.
    /// `intention` is only consulted for the resonance flag.
    pub fn resolve_tick<R: VariateSource + ?Sized>(
        &mut self,
        now: CeremonyTimestamp,
        resonance: &ResonanceMap,
        intention: Option<&Intention>,
        rng: &mut R,
    ) -> Vec<ResolutionRecord> {
        let mut records = Vec::new();
        let mut survivors = Vec::with_capacity(self.active.len());

        for entity in std::mem::take(&mut self.active) {
            if !rng.chance(self.config.collapse_probability) {
                survivors.push(entity);
                continue;
            }

            let (chosen, rejected) = entity.outcomes.split(rng.chance(0.5));
            let resonance_echo = match intention {
                Some(intent) => resonance.echoes(&entity.category_id, intent.tokens(), rng),
                None => false,
            };

            let record = ResolutionRecord {
                timestamp: now,
                entity_id: entity.id,
                category_id: entity.category_id.clone(),
                label: entity.label.clone(),
                chosen_outcome: chosen.to_string(),
                rejected_outcome: rejected.to_string(),
                intensity: entity.intensity,
                resonance_echo,
                lifetime_secs: entity.age_secs(now),
            };
            tracing::debug!(
                entity = %entity.id,
                chosen = %record.chosen_outcome,
                echo = record.resonance_echo,
                "superposition collapsed"
            );
            records.push(record);
        }

        self.active = survivors;
        self.resolutions += records.len();
        records
    }

    /// Runs one full tick: arrival trial (when `allow_arrivals`) followed by
    /// collapse trials (when `allow_collapse`).
    #[allow(clippy::too_many_arguments)]
    pub fn tick<R: VariateSource + ?Sized>(
        &mut self,
        dt: Duration,
        now: CeremonyTimestamp,
        catalog: &EventCatalog,
        quota: &mut OccurrenceQuota,
        resonance: &ResonanceMap,
        intention: Option<&Intention>,
        rng: &mut R,
        allow_arrivals: bool,
        allow_collapse: bool,
    ) -> Result<PopulationTick> {
        let arrival = if allow_arrivals {
            self.try_arrive(dt, now, catalog, quota, rng)?
        } else {
            None
        };
        let resolutions = if allow_collapse {
            self.resolve_tick(now, resonance, intention, rng)
        } else {
            Vec::new()
        };
        Ok(PopulationTick { arrival, resolutions })
    }
}
