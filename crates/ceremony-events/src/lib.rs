//! Shared record types and serialization for the ceremony engine.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod category;
pub mod entity;
pub mod phase;
pub mod record;
pub mod timestamp;

pub use category::{Category, IntensityRange, OutcomePair};
pub use entity::{Entity, EntityId};
pub use phase::{DecayMode, ParseVariantError, Phase, VariantKind};
pub use record::{AppliedEventRecord, ResolutionRecord, RELIEF_CATEGORY_ID};
pub use timestamp::CeremonyTimestamp;
