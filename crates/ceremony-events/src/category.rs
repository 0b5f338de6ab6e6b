//! Catalog Category Types
//!
//! Immutable catalog entries: a named category with a selection weight and
//! the range its nominal intensity is drawn from.

use serde::{Deserialize, Serialize};

/// Closed range a category's nominal intensity is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityRange {
    pub min: f64,
    pub max: f64,
}

impl IntensityRange {
    /// Creates a new IntensityRange.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if both bounds are finite and `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Returns true if `value` lies within the range (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The two outcomes a superposition can collapse into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomePair {
    pub first: String,
    pub second: String,
}

impl OutcomePair {
    /// Creates a new OutcomePair.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Returns `(chosen, rejected)` for the given side.
    pub fn split(&self, pick_first: bool) -> (&str, &str) {
        if pick_first {
            (&self.first, &self.second)
        } else {
            (&self.second, &self.first)
        }
    }

    /// Returns true if `outcome` is one of the pair.
    pub fn contains(&self, outcome: &str) -> bool {
        self.first == outcome || self.second == outcome
    }

    /// Returns true if the two outcomes are distinct and non-empty.
    pub fn is_valid(&self) -> bool {
        !self.first.is_empty() && !self.second.is_empty() && self.first != self.second
    }
}

/// A catalog entry.
///
/// Weights within a catalog need not sum to 1; selection is proportional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier (e.g. "sharp_hit")
    pub id: String,
    /// Human-readable label shown by renderers
    pub display_name: String,
    /// Relative selection weight, must be > 0
    pub weight: f64,
    /// Range the nominal intensity is drawn from
    pub intensity_range: IntensityRange,
    /// Outcome pair for superposition templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<OutcomePair>,
    /// Cap on how often this category may occur in one run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurrences: Option<u32>,
}

impl Category {
    /// Creates a new Category with no outcome pair and no occurrence cap.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        weight: f64,
        intensity_range: IntensityRange,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            weight,
            intensity_range,
            outcomes: None,
            max_occurrences: None,
        }
    }

    /// Attaches an outcome pair, turning the category into a superposition template.
    pub fn with_outcomes(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.outcomes = Some(OutcomePair::new(first, second));
        self
    }

    /// Caps how many times this category may occur per run.
    pub fn with_max_occurrences(mut self, max: u32) -> Self {
        self.max_occurrences = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_range_validity() {
        assert!(IntensityRange::new(0.02, 0.05).is_valid());
        assert!(IntensityRange::new(0.1, 0.1).is_valid());
        assert!(!IntensityRange::new(0.5, 0.1).is_valid());
        assert!(!IntensityRange::new(f64::NAN, 0.1).is_valid());
        assert!(!IntensityRange::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_intensity_range_contains_bounds() {
        let range = IntensityRange::new(0.25, 0.40);
        assert!(range.contains(0.25));
        assert!(range.contains(0.40));
        assert!(!range.contains(0.41));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_outcome_pair_split() {
        let pair = OutcomePair::new("open", "closed");
        assert_eq!(pair.split(true), ("open", "closed"));
        assert_eq!(pair.split(false), ("closed", "open"));
        assert!(pair.contains("open"));
        assert!(!pair.contains("ajar"));
    }

    #[test]
    fn test_outcome_pair_validity() {
        assert!(OutcomePair::new("a", "b").is_valid());
        assert!(!OutcomePair::new("a", "a").is_valid());
        assert!(!OutcomePair::new("", "b").is_valid());
    }

    #[test]
    fn test_category_builder() {
        let cat = Category::new("deep_roll", "deep roll", 0.01, IntensityRange::new(0.25, 0.40))
            .with_max_occurrences(2);
        assert_eq!(cat.max_occurrences, Some(2));
        assert!(cat.outcomes.is_none());
    }

    #[test]
    fn test_category_serialization_skips_empty_options() {
        let cat = Category::new("soft_veil", "soft veil", 0.5, IntensityRange::new(0.001, 0.008));
        let json = serde_json::to_string(&cat).unwrap();
        assert!(!json.contains("outcomes"));
        assert!(!json.contains("max_occurrences"));

        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cat);
    }
}
