//! Presentation seam.
//!
//! Renderers and audio collaborators implement [`CeremonyObserver`]. A
//! failing observer never stops the simulation: the [`Emitter`] logs the
//! failure, counts it, and moves on.

use std::time::Duration;

use ceremony_events::{AppliedEventRecord, Entity, Phase, ResolutionRecord};
use thiserror::Error;

use crate::history::{HistoryLog, HistoryRecord};

/// Failure reported by a presentation collaborator.
#[derive(Debug, Error)]
pub enum PresentationError {
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

pub type PresentResult = Result<(), PresentationError>;

/// Receives ceremony events as they happen. Every hook defaults to a no-op.
pub trait CeremonyObserver {
    fn on_phase_start(&mut self, _phase: Phase, _budget: Duration) -> PresentResult {
        Ok(())
    }

    fn on_phase_end(&mut self, _phase: Phase) -> PresentResult {
        Ok(())
    }

    /// A new superposition appeared.
    fn on_arrival(&mut self, _entity: &Entity) -> PresentResult {
        Ok(())
    }

    /// A superposition collapsed.
    fn on_resolution(&mut self, _record: &ResolutionRecord) -> PresentResult {
        Ok(())
    }

    /// An ambient perturbation was applied.
    fn on_ambient_event(&mut self, _record: &AppliedEventRecord) -> PresentResult {
        Ok(())
    }

    /// An active perturbation was applied; `triggered` is set when it crossed
    /// the announcement threshold.
    fn on_shock_event(&mut self, _record: &AppliedEventRecord, _triggered: bool) -> PresentResult {
        Ok(())
    }

    /// A closing relief step was applied.
    fn on_relief(&mut self, _record: &AppliedEventRecord) -> PresentResult {
        Ok(())
    }
}

/// Observer used when no renderer is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl CeremonyObserver for NullObserver {}

/// Hands records to the history and the observer, in that order of truth:
/// the history append always happens, observer failures are only logged.
pub struct Emitter<'a, T> {
    history: &'a mut HistoryLog<T>,
    observer: &'a mut dyn CeremonyObserver,
    failures: &'a mut usize,
}

impl<'a, T: HistoryRecord> Emitter<'a, T> {
    pub fn new(
        history: &'a mut HistoryLog<T>,
        observer: &'a mut dyn CeremonyObserver,
        failures: &'a mut usize,
    ) -> Self {
        Self {
            history,
            observer,
            failures,
        }
    }

    /// Calls the observer, swallowing and logging any failure.
    pub fn notify<F>(&mut self, hook: &'static str, call: F)
    where
        F: FnOnce(&mut dyn CeremonyObserver) -> PresentResult,
    {
        if let Err(e) = call(&mut *self.observer) {
            *self.failures += 1;
            tracing::warn!(hook, error = %e, "presentation failed; continuing");
        }
    }

    /// Presents `record`, then appends it to the history.
    pub fn commit<F>(&mut self, hook: &'static str, record: T, present: F)
    where
        F: FnOnce(&mut dyn CeremonyObserver, &T) -> PresentResult,
    {
        if let Err(e) = present(&mut *self.observer, &record) {
            *self.failures += 1;
            tracing::warn!(hook, error = %e, "presentation failed; continuing");
        }
        self.history.append(record);
    }

    pub fn history(&self) -> &HistoryLog<T> {
        self.history
    }
}
