//! Stochastic event-lifecycle engine for timed ceremonies.
//!
//! Two variants share one driver: a discrete one where superpositions arrive
//! and collapse into one of two outcomes, and a continuous one where a single
//! affect state is perturbed and relaxes back toward its baseline.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod decay;
pub mod driver;
pub mod error;
pub mod export;
pub mod history;
pub mod observer;
pub mod population;
pub mod resonance;
pub mod rng;
pub mod summary;
pub mod variant;

pub use catalog::{EventCatalog, OccurrenceQuota};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CeremonyConfig, ConfigError};
pub use decay::{AffectState, DecayConfig, DecayStateManager, Relief};
pub use driver::{CeremonyDriver, PhasePlan};
pub use error::{CeremonyError, Result};
pub use history::{CategoryCount, HistoryLog, HistoryRecord};
pub use observer::{CeremonyObserver, NullObserver, PresentResult, PresentationError};
pub use population::{PopulationConfig, PopulationManager};
pub use resonance::{Intention, ResonanceMap};
pub use rng::{ScriptedVariates, SeededVariates, VariateSource};
pub use summary::{CollapseSummary, DecaySummary, RunStats};
pub use variant::{CeremonyVariant, CollapseCeremony, DecayCeremony, TickContext};
