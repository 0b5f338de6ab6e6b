//! Resolution strategies.
//!
//! One driver runs either ceremony. A [`CeremonyVariant`] decides what each
//! phase does with a tick; the driver only sequences phases and enforces
//! their time budgets.
//!
//! | phase   | collapse                        | decay                          |
//! |---------|---------------------------------|--------------------------------|
//! | ambient | arrivals only                   | mist, ambient decay rate       |
//! | active  | arrivals and collapse trials    | shocks, active decay rate      |
//! | closing | collapse trials, no arrivals    | fixed relief sequence          |

use std::time::Duration;

use ceremony_events::{
    AppliedEventRecord, CeremonyTimestamp, DecayMode, Phase, ResolutionRecord, VariantKind,
    RELIEF_CATEGORY_ID,
};
use serde::Serialize;

use crate::catalog::{EventCatalog, OccurrenceQuota};
use crate::decay::{DecayConfig, DecayStateManager};
use crate::error::Result;
use crate::history::{HistoryLog, HistoryRecord};
use crate::observer::Emitter;
use crate::population::{PopulationConfig, PopulationManager};
use crate::resonance::{Intention, ResonanceMap};
use crate::rng::{weighted_choice, VariateSource};
use crate::summary::{CappedUsage, CollapseSummary, DecaySummary, OutcomeCount, RunStats};

/// Upper bound on perturbations fired inside a single tick.
const MAX_EVENTS_PER_TICK: usize = 64;

/// Where the driver is when it hands a tick to the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub phase: Phase,
    pub now: CeremonyTimestamp,
    /// Time since the previous tick
    pub dt: Duration,
    /// Time since the current phase started
    pub phase_elapsed: Duration,
}

/// A pluggable resolution strategy.
pub trait CeremonyVariant {
    type Record: HistoryRecord + Serialize + Clone;
    type Summary: Serialize;

    fn kind(&self) -> VariantKind;

    /// Length of the closing phase.
    fn closing_duration(&self) -> Duration;

    fn begin_phase<R: VariateSource + ?Sized>(
        &mut self,
        _phase: Phase,
        _now: CeremonyTimestamp,
        _rng: &mut R,
        _out: &mut Emitter<'_, Self::Record>,
    ) -> Result<()> {
        Ok(())
    }

    fn step<R: VariateSource + ?Sized>(
        &mut self,
        tick: &TickContext,
        rng: &mut R,
        out: &mut Emitter<'_, Self::Record>,
    ) -> Result<()>;

    fn end_phase<R: VariateSource + ?Sized>(
        &mut self,
        _phase: Phase,
        _now: CeremonyTimestamp,
        _rng: &mut R,
        _out: &mut Emitter<'_, Self::Record>,
    ) -> Result<()> {
        Ok(())
    }

    /// Active population for collapse, current affect state for decay.
    fn state_value(&self) -> f64;

    fn summarize(
        &self,
        history: &HistoryLog<Self::Record>,
        top_n: usize,
        run: RunStats,
    ) -> Self::Summary;
}

/// Discrete superpositions collapsing into one of two outcomes.
#[derive(Debug, Clone)]
pub struct CollapseCeremony {
    catalog: EventCatalog,
    quota: OccurrenceQuota,
    resonance: ResonanceMap,
    intention: Option<Intention>,
    population: PopulationManager,
    closing: Duration,
}

impl CollapseCeremony {
    pub fn new(
        catalog: EventCatalog,
        resonance: ResonanceMap,
        intention: Option<Intention>,
        population: PopulationConfig,
        closing: Duration,
    ) -> Result<Self> {
        Ok(Self {
            catalog,
            quota: OccurrenceQuota::new(),
            resonance,
            intention,
            population: PopulationManager::new(population)?,
            closing,
        })
    }

    pub fn population(&self) -> &PopulationManager {
        &self.population
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }
}

impl CeremonyVariant for CollapseCeremony {
    type Record = ResolutionRecord;
    type Summary = CollapseSummary;

    fn kind(&self) -> VariantKind {
        VariantKind::Collapse
    }

    fn closing_duration(&self) -> Duration {
        self.closing
    }

    fn step<R: VariateSource + ?Sized>(
        &mut self,
        tick: &TickContext,
        rng: &mut R,
        out: &mut Emitter<'_, ResolutionRecord>,
    ) -> Result<()> {
        let outcome = self.population.tick(
            tick.dt,
            tick.now,
            &self.catalog,
            &mut self.quota,
            &self.resonance,
            self.intention.as_ref(),
            rng,
            tick.phase != Phase::Closing,
            tick.phase != Phase::Ambient,
        )?;

        if let Some(entity) = outcome.arrival {
            out.notify("arrival", |o| o.on_arrival(&entity));
        }
        for record in outcome.resolutions {
            out.commit("resolution", record, |o, r| o.on_resolution(r));
        }
        Ok(())
    }

    fn state_value(&self) -> f64 {
        self.population.active_count() as f64
    }

    fn summarize(
        &self,
        history: &HistoryLog<ResolutionRecord>,
        top_n: usize,
        run: RunStats,
    ) -> CollapseSummary {
        let mut outcomes: Vec<OutcomeCount> = Vec::new();
        for record in history {
            match outcomes.iter_mut().find(|o| o.outcome == record.chosen_outcome) {
                Some(entry) => entry.count += 1,
                None => outcomes.push(OutcomeCount {
                    outcome: record.chosen_outcome.clone(),
                    count: 1,
                }),
            }
        }
        outcomes.sort_by(|a, b| b.count.cmp(&a.count));

        CollapseSummary {
            variant: VariantKind::Collapse,
            total_count: history.len(),
            active_remaining: self.population.active_count(),
            arrivals: self.population.total_arrivals(),
            resolutions: self.population.total_resolutions(),
            echoed: history.count_where(|r| r.resonance_echo),
            intention: self.intention.as_ref().map(|i| i.text().to_string()),
            top_records: history.top_by_intensity(top_n).into_iter().cloned().collect(),
            distribution: history.distribution(),
            outcomes,
            unresolved: self.population.active().to_vec(),
            run,
        }
    }
}

/// Continuous affect state perturbed by mist and shocks, then relieved.
#[derive(Debug, Clone)]
pub struct DecayCeremony {
    mist: EventCatalog,
    shock: EventCatalog,
    quota: OccurrenceQuota,
    state: DecayStateManager,
    relief_pause: Duration,
    closing: Duration,
    /// Seconds until the next perturbation
    until_next: f64,
    reliefs_applied: usize,
}

impl DecayCeremony {
    pub fn new(mist: EventCatalog, shock: EventCatalog, config: DecayConfig) -> Result<Self> {
        let state = DecayStateManager::new(config)?;
        Ok(Self {
            mist,
            shock,
            quota: OccurrenceQuota::new(),
            relief_pause: state.config().relief_pause()?,
            closing: state.config().closing_duration()?,
            state,
            until_next: f64::INFINITY,
            reliefs_applied: 0,
        })
    }

    pub fn state(&self) -> &DecayStateManager {
        &self.state
    }

    /// Capped-category usage across both catalogs.
    pub fn capped_usage(&self) -> Vec<CappedUsage> {
        let mut usage = self.quota.capped_usage(&self.mist);
        usage.extend(self.quota.capped_usage(&self.shock));
        usage
            .into_iter()
            .map(|(category_id, occurrences, max)| CappedUsage {
                category_id,
                occurrences,
                max,
            })
            .collect()
    }

    fn next_gap<R: VariateSource + ?Sized>(&self, mode: DecayMode, rng: &mut R) -> Result<f64> {
        let config = self.state.config();
        match mode {
            DecayMode::Ambient => Ok(rng.exponential_interval(config.ambient_rate)),
            DecayMode::Active => {
                let mut gap = rng.exponential_interval(config.active_rate);
                if rng.chance(config.burst_probability) {
                    let even = vec![1.0; config.burst_factors.len()];
                    gap *= *weighted_choice(rng, config.burst_factors.as_slice(), &even)?;
                }
                Ok(gap)
            }
        }
    }

    fn perturb<R: VariateSource + ?Sized>(
        &mut self,
        mode: DecayMode,
        now: CeremonyTimestamp,
        rng: &mut R,
        out: &mut Emitter<'_, AppliedEventRecord>,
    ) -> Result<()> {
        let catalog = match mode {
            DecayMode::Ambient => &self.mist,
            DecayMode::Active => &self.shock,
        };
        let category = self.quota.sample(catalog, rng)?;
        let (record, triggered) = self.state.apply_event(category, mode, now, rng);
        tracing::debug!(
            category = %record.category_id,
            intensity = record.intensity,
            state = record.state_after,
            triggered,
            "perturbation applied"
        );

        match mode {
            DecayMode::Ambient => out.commit("ambient", record, |o, r| o.on_ambient_event(r)),
            DecayMode::Active => {
                out.commit("shock", record, |o, r| o.on_shock_event(r, triggered))
            }
        }
        Ok(())
    }

    fn relieve(&mut self, now: CeremonyTimestamp, out: &mut Emitter<'_, AppliedEventRecord>) {
        let Some(relief) = self.state.config().reliefs.get(self.reliefs_applied).cloned() else {
            return;
        };
        let record = self.state.apply_relief(&relief, now);
        self.reliefs_applied += 1;
        tracing::debug!(relief = %relief.name, state = record.state_after, "relief applied");
        out.commit("relief", record, |o, r| o.on_relief(r));
    }
}

impl CeremonyVariant for DecayCeremony {
    type Record = AppliedEventRecord;
    type Summary = DecaySummary;

    fn kind(&self) -> VariantKind {
        VariantKind::Decay
    }

    fn closing_duration(&self) -> Duration {
        self.closing
    }

    fn begin_phase<R: VariateSource + ?Sized>(
        &mut self,
        phase: Phase,
        _now: CeremonyTimestamp,
        rng: &mut R,
        _out: &mut Emitter<'_, AppliedEventRecord>,
    ) -> Result<()> {
        match phase {
            Phase::Ambient | Phase::Active => {
                self.until_next = self.next_gap(phase.decay_mode(), rng)?;
            }
            Phase::Closing => {
                self.until_next = f64::INFINITY;
                self.reliefs_applied = 0;
            }
        }
        Ok(())
    }

    fn step<R: VariateSource + ?Sized>(
        &mut self,
        tick: &TickContext,
        rng: &mut R,
        out: &mut Emitter<'_, AppliedEventRecord>,
    ) -> Result<()> {
        if tick.phase == Phase::Closing {
            // Every due time is below `closing`, which was checked for overflow
            while self.reliefs_applied < self.state.config().reliefs.len()
                && tick.phase_elapsed >= self.relief_pause * (self.reliefs_applied as u32 + 1)
            {
                self.relieve(tick.now, out);
            }
            return Ok(());
        }

        let mode = tick.phase.decay_mode();
        self.state.decay_for(tick.dt, mode);

        self.until_next -= tick.dt.as_secs_f64();
        let mut fired = 0;
        while self.until_next <= 0.0 && fired < MAX_EVENTS_PER_TICK {
            self.perturb(mode, tick.now, rng, out)?;
            self.until_next += self.next_gap(mode, rng)?;
            fired += 1;
        }
        Ok(())
    }

    fn end_phase<R: VariateSource + ?Sized>(
        &mut self,
        phase: Phase,
        now: CeremonyTimestamp,
        _rng: &mut R,
        out: &mut Emitter<'_, AppliedEventRecord>,
    ) -> Result<()> {
        if phase == Phase::Closing {
            while self.reliefs_applied < self.state.config().reliefs.len() {
                self.relieve(now, out);
            }
        }
        Ok(())
    }

    fn state_value(&self) -> f64 {
        self.state.current()
    }

    fn summarize(
        &self,
        history: &HistoryLog<AppliedEventRecord>,
        top_n: usize,
        run: RunStats,
    ) -> DecaySummary {
        let state = self.state.state();
        let mut distribution = history.distribution();
        for entry in &mut distribution {
            if entry.category_id == RELIEF_CATEGORY_ID {
                entry.label = "Relief".to_string();
            }
        }

        DecaySummary {
            variant: VariantKind::Decay,
            total_count: history.len(),
            ambient_events: history.count_where(|r| r.is_ambient),
            active_events: history.count_where(|r| !r.is_ambient && !r.is_relief()),
            relief_events: history.count_where(|r| r.is_relief()),
            announced_events: history.count_where(|r| {
                !r.is_ambient && !r.is_relief() && self.state.is_triggered(r.intensity)
            }),
            capped: self.capped_usage(),
            net_accumulation: state.accumulated_displacement,
            final_state: state.current,
            baseline: state.baseline,
            displacement: state.displacement(),
            top_records: history.top_by_intensity(top_n).into_iter().cloned().collect(),
            most_intense: history
                .top_by(top_n, |r| r.intensity > 0.0 && !r.is_ambient, |r| r.intensity)
                .into_iter()
                .cloned()
                .collect(),
            most_relieving: history
                .top_by(top_n, |r| r.intensity < 0.0, |r| -r.intensity)
                .into_iter()
                .cloned()
                .collect(),
            distribution,
            run,
        }
    }
}
