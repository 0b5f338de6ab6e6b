//! Ceremony driver.
//!
//! Sequences the three phases, paces ticks against a [`Clock`] and hands each
//! tick to the variant. Phase budgets are measured in clock time, so a run
//! under [`ManualClock`](crate::clock::ManualClock) is bit-for-bit
//! reproducible from its seed.

use std::time::Duration;

use ceremony_events::{CeremonyTimestamp, Phase, VariantKind};

use crate::clock::Clock;
use crate::error::{CeremonyError, Result};
use crate::history::HistoryLog;
use crate::observer::{CeremonyObserver, Emitter, NullObserver};
use crate::rng::VariateSource;
use crate::summary::RunStats;
use crate::variant::{CeremonyVariant, TickContext};

/// Phase budgets and pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasePlan {
    /// Length of the ambient phase; zero skips it
    pub ambient: Duration,
    pub active: Duration,
    /// Target interval between ticks
    pub tick_interval: Duration,
    /// Silence between consecutive phases
    pub phase_gap: Duration,
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self {
            ambient: Duration::from_secs(15),
            active: Duration::from_secs(35),
            tick_interval: Duration::from_millis(50),
            phase_gap: Duration::from_secs(2),
        }
    }
}

impl PhasePlan {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(CeremonyError::config("tick_interval must be positive"));
        }
        Ok(())
    }

    /// Budget for `phase` given the variant's closing length.
    pub fn budget(&self, phase: Phase, closing: Duration) -> Duration {
        match phase {
            Phase::Ambient => self.ambient,
            Phase::Active => self.active,
            Phase::Closing => closing,
        }
    }
}

/// Runs one ceremony end to end.
pub struct CeremonyDriver<V: CeremonyVariant, R: VariateSource, C: Clock> {
    variant: V,
    rng: R,
    clock: C,
    observer: Box<dyn CeremonyObserver>,
    history: HistoryLog<V::Record>,
    plan: PhasePlan,
    top_n: usize,
    ticks: u64,
    failures: usize,
}

impl<V: CeremonyVariant, R: VariateSource, C: Clock> CeremonyDriver<V, R, C> {
    pub fn new(variant: V, rng: R, clock: C, plan: PhasePlan) -> Result<Self> {
        plan.validate()?;
        Ok(Self {
            variant,
            rng,
            clock,
            observer: Box::new(NullObserver),
            history: HistoryLog::new(),
            plan,
            top_n: 5,
            ticks: 0,
            failures: 0,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn CeremonyObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Number of records in each summary ranking.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn kind(&self) -> VariantKind {
        self.variant.kind()
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn history(&self) -> &HistoryLog<V::Record> {
        &self.history
    }

    pub fn into_history(self) -> HistoryLog<V::Record> {
        self.history
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Observer callbacks that failed so far.
    pub fn presentation_failures(&self) -> usize {
        self.failures
    }

    /// Runs ambient, active and closing in order.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(variant = %self.variant.kind(), "ceremony starting");

        let closing = self.variant.closing_duration();
        let mut started = false;
        for phase in Phase::ALL {
            let budget = self.plan.budget(phase, closing);
            if budget.is_zero() && phase != Phase::Closing {
                tracing::debug!(%phase, "phase has no budget; skipped");
                continue;
            }
            if started && !self.plan.phase_gap.is_zero() {
                self.clock.sleep(self.plan.phase_gap);
            }
            self.run_phase(phase, budget)?;
            started = true;
        }

        tracing::info!(
            ticks = self.ticks,
            records = self.history.len(),
            presentation_failures = self.failures,
            "ceremony complete"
        );
        Ok(())
    }

    fn run_phase(&mut self, phase: Phase, budget: Duration) -> Result<()> {
        let phase_start = self.clock.elapsed();
        let records_before = self.history.len();
        tracing::info!(%phase, budget_secs = budget.as_secs_f64(), "phase starting");

        {
            let now = CeremonyTimestamp::new(self.ticks, phase_start);
            let mut out = Emitter::new(&mut self.history, self.observer.as_mut(), &mut self.failures);
            out.notify("phase_start", |o| o.on_phase_start(phase, budget));
            self.variant.begin_phase(phase, now, &mut self.rng, &mut out)?;
        }

        let mut last = phase_start;
        loop {
            let phase_elapsed = self.clock.elapsed().saturating_sub(phase_start);
            if phase_elapsed >= budget {
                break;
            }
            self.clock.sleep(self.plan.tick_interval.min(budget - phase_elapsed));

            let elapsed = self.clock.elapsed();
            self.ticks += 1;
            let tick = TickContext {
                phase,
                now: CeremonyTimestamp::new(self.ticks, elapsed),
                dt: elapsed.saturating_sub(last),
                phase_elapsed: elapsed.saturating_sub(phase_start),
            };
            last = elapsed;

            let mut out = Emitter::new(&mut self.history, self.observer.as_mut(), &mut self.failures);
            self.variant.step(&tick, &mut self.rng, &mut out)?;
            tracing::trace!(tick = self.ticks, state = self.variant.state_value(), "tick");
        }

        {
            let now = CeremonyTimestamp::new(self.ticks, self.clock.elapsed());
            let mut out = Emitter::new(&mut self.history, self.observer.as_mut(), &mut self.failures);
            self.variant.end_phase(phase, now, &mut self.rng, &mut out)?;
            out.notify("phase_end", |o| o.on_phase_end(phase));
        }

        tracing::info!(
            %phase,
            records = self.history.len() - records_before,
            state = self.variant.state_value(),
            "phase complete"
        );
        Ok(())
    }

    /// End-of-run summary over the history so far.
    pub fn summary(&self) -> V::Summary {
        let run = RunStats {
            ticks: self.ticks,
            elapsed_secs: self.clock.elapsed().as_secs_f64(),
            presentation_failures: self.failures,
        };
        self.variant.summarize(&self.history, self.top_n, run)
    }
}
