//! History Record Types
//!
//! Immutable records appended to the history once per resolved entity or
//! applied perturbation.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::timestamp::CeremonyTimestamp;

/// Category id carried by closing-phase relief records.
pub const RELIEF_CATEGORY_ID: &str = "relief";

/// Outcome of a collapsed superposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub timestamp: CeremonyTimestamp,
    pub entity_id: EntityId,
    pub category_id: String,
    pub label: String,
    pub chosen_outcome: String,
    pub rejected_outcome: String,
    pub intensity: f64,
    /// Decoration only: never influences which outcome was chosen
    pub resonance_echo: bool,
    /// Seconds the entity stayed unresolved
    pub lifetime_secs: f64,
}

/// A perturbation applied to the affect state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEventRecord {
    pub timestamp: CeremonyTimestamp,
    pub category_id: String,
    pub label: String,
    /// Effective intensity after chaos scaling
    pub intensity: f64,
    pub chaos_factor: f64,
    pub state_before: f64,
    pub state_after: f64,
    pub is_ambient: bool,
}

impl AppliedEventRecord {
    /// Intensity before chaos scaling.
    pub fn nominal_intensity(&self) -> f64 {
        if self.chaos_factor == 0.0 {
            0.0
        } else {
            self.intensity / self.chaos_factor
        }
    }

    /// Returns true for closing-phase relief records.
    pub fn is_relief(&self) -> bool {
        self.category_id == RELIEF_CATEGORY_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_applied(category_id: &str, intensity: f64, chaos: f64) -> AppliedEventRecord {
        AppliedEventRecord {
            timestamp: CeremonyTimestamp::new(1, Duration::from_millis(50)),
            category_id: category_id.to_string(),
            label: category_id.to_string(),
            intensity,
            chaos_factor: chaos,
            state_before: 1.0,
            state_after: 1.0 + intensity,
            is_ambient: false,
        }
    }

    #[test]
    fn test_nominal_intensity() {
        let record = make_applied("sharp_hit", 0.12, 1.5);
        assert!((record.nominal_intensity() - 0.08).abs() < 1e-12);
        assert_eq!(make_applied("odd", 0.1, 0.0).nominal_intensity(), 0.0);
    }

    #[test]
    fn test_is_relief() {
        assert!(make_applied(RELIEF_CATEGORY_ID, -0.18, 1.0).is_relief());
        assert!(!make_applied("gentle_tap", 0.03, 1.0).is_relief());
    }

    #[test]
    fn test_resolution_record_json_shape() {
        let record = ResolutionRecord {
            timestamp: CeremonyTimestamp::new(9, Duration::from_millis(450)),
            entity_id: EntityId(3),
            category_id: "coin".to_string(),
            label: "a tossed coin".to_string(),
            chosen_outcome: "heads".to_string(),
            rejected_outcome: "tails".to_string(),
            intensity: 0.42,
            resonance_echo: true,
            lifetime_secs: 0.3,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["entity_id"], 3);
        assert_eq!(value["chosen_outcome"], "heads");
        assert_eq!(value["resonance_echo"], true);
        assert_eq!(value["timestamp"]["tick"], 9);
    }
}
