//! Superposition Entity Types
//!
//! A discrete, unresolved item waiting to collapse into one of two outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::category::OutcomePair;
use crate::timestamp::CeremonyTimestamp;

/// Sequential identifier for a superposition within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sup_{:06}", self.0)
    }
}

/// An unresolved superposition.
///
/// Owned by the population from creation until it collapses; there is no
/// intermediate state between "active" and "resolved".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub category_id: String,
    /// Display name of the template the entity was sampled from
    pub label: String,
    pub outcomes: OutcomePair,
    /// Nominal intensity, within the template's declared range
    pub intensity: f64,
    pub created_at: CeremonyTimestamp,
}

impl Entity {
    /// Time the entity has spent unresolved as of `now`.
    pub fn age_secs(&self, now: CeremonyTimestamp) -> f64 {
        now.elapsed.saturating_sub(self.created_at.elapsed).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn make_entity() -> Entity {
        Entity {
            id: EntityId(12),
            category_id: "door".to_string(),
            label: "the door".to_string(),
            outcomes: OutcomePair::new("open", "closed"),
            intensity: 0.5,
            created_at: CeremonyTimestamp::new(4, Duration::from_secs(2)),
        }
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId(12).to_string(), "sup_000012");
    }

    #[test]
    fn test_age() {
        let entity = make_entity();
        let later = CeremonyTimestamp::new(10, Duration::from_millis(3_500));
        assert!((entity.age_secs(later) - 1.5).abs() < 1e-9);

        let earlier = CeremonyTimestamp::new(1, Duration::from_secs(1));
        assert_eq!(entity.age_secs(earlier), 0.0);
    }

    #[test]
    fn test_entity_id_serializes_transparently() {
        let json = serde_json::to_string(&make_entity()).unwrap();
        assert!(json.contains(r#""id":12"#));
    }
}
