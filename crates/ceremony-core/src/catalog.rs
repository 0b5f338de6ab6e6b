//! Event catalogs.
//!
//! A catalog is a static, read-only table of categories sampled by weight.
//! Per-run occurrence caps ("thunder may only roll twice") are tracked by an
//! [`OccurrenceQuota`] owned by the caller, never by the catalog itself.

use std::collections::{BTreeMap, HashSet};

use ceremony_events::{Category, IntensityRange, RELIEF_CATEGORY_ID};

use crate::error::{CeremonyError, Result};
use crate::rng::VariateSource;

/// Immutable weighted table of categories.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCatalog {
    name: String,
    categories: Vec<Category>,
}

impl EventCatalog {
    /// Builds a catalog, rejecting empty tables, duplicate or reserved ids,
    /// non-positive weights and malformed intensity ranges.
    pub fn new(name: impl Into<String>, categories: Vec<Category>) -> Result<Self> {
        let name = name.into();
        if categories.is_empty() {
            return Err(CeremonyError::config(format!("catalog '{}' is empty", name)));
        }

        let mut seen = HashSet::new();
        for cat in &categories {
            if cat.id == RELIEF_CATEGORY_ID {
                return Err(CeremonyError::config(format!(
                    "catalog '{}' uses the reserved id '{}'",
                    name, cat.id
                )));
            }
            if !seen.insert(cat.id.as_str()) {
                return Err(CeremonyError::config(format!(
                    "catalog '{}' lists '{}' twice",
                    name, cat.id
                )));
            }
            if !cat.weight.is_finite() || cat.weight <= 0.0 {
                return Err(CeremonyError::config(format!(
                    "category '{}' has weight {}, expected a finite value > 0",
                    cat.id, cat.weight
                )));
            }
            if !cat.intensity_range.is_valid() {
                return Err(CeremonyError::config(format!(
                    "category '{}' has intensity range {:?}",
                    cat.id, cat.intensity_range
                )));
            }
        }

        Ok(Self { name, categories })
    }

    /// Builds a catalog whose every entry carries a valid outcome pair and
    /// an intensity range strictly inside (0, 1).
    pub fn superposition(name: impl Into<String>, categories: Vec<Category>) -> Result<Self> {
        let catalog = Self::new(name, categories)?;
        for cat in &catalog.categories {
            let range = cat.intensity_range;
            if range.min <= 0.0 || range.max >= 1.0 {
                return Err(CeremonyError::config(format!(
                    "superposition template '{}' has intensity range {:?}, expected within (0, 1)",
                    cat.id, range
                )));
            }
            match &cat.outcomes {
                Some(pair) if pair.is_valid() => {}
                _ => {
                    return Err(CeremonyError::config(format!(
                        "superposition template '{}' needs two distinct outcomes",
                        cat.id
                    )))
                }
            }
        }
        Ok(catalog)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|c| c.display_name.as_str()).unwrap_or(id)
    }

    /// Samples a category proportionally to its weight.
    pub fn sample<R: VariateSource + ?Sized>(&self, rng: &mut R) -> Result<&Category> {
        let weights: Vec<f64> = self.categories.iter().map(|c| c.weight).collect();
        let index = rng.weighted_index(&weights)?;
        Ok(&self.categories[index])
    }

    /// Samples among the categories whose id is not in `excluded`.
    ///
    /// Fails with `InvalidDistribution` if the exclusion leaves nothing.
    pub fn sample_excluding<R: VariateSource + ?Sized>(
        &self,
        rng: &mut R,
        excluded: &HashSet<String>,
    ) -> Result<&Category> {
        if excluded.is_empty() {
            return self.sample(rng);
        }

        let candidates: Vec<&Category> = self
            .categories
            .iter()
            .filter(|c| !excluded.contains(&c.id))
            .collect();
        if candidates.is_empty() {
            return Err(CeremonyError::distribution(format!(
                "every category in '{}' is excluded",
                self.name
            )));
        }

        let weights: Vec<f64> = candidates.iter().map(|c| c.weight).collect();
        let index = rng.weighted_index(&weights)?;
        Ok(candidates[index])
    }
}

/// Per-run occurrence counter for capped categories.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceQuota {
    counts: BTreeMap<String, u32>,
}

impl OccurrenceQuota {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `category`.
    pub fn record(&mut self, category: &Category) {
        *self.counts.entry(category.id.clone()).or_insert(0) += 1;
    }

    pub fn count(&self, id: &str) -> u32 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Ids of categories in `catalog` whose cap has been reached.
    pub fn exhausted(&self, catalog: &EventCatalog) -> HashSet<String> {
        catalog
            .categories()
            .iter()
            .filter(|c| matches!(c.max_occurrences, Some(max) if self.count(&c.id) >= max))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Samples from `catalog` honouring every cap, then records the pick.
    pub fn sample<'c, R: VariateSource + ?Sized>(
        &mut self,
        catalog: &'c EventCatalog,
        rng: &mut R,
    ) -> Result<&'c Category> {
        let excluded = self.exhausted(catalog);
        let category = catalog.sample_excluding(rng, &excluded)?;
        self.record(category);
        if let Some(max) = category.max_occurrences {
            if self.count(&category.id) >= max {
                tracing::debug!(
                    category = %category.id,
                    max,
                    "occurrence cap reached; category retired for this run"
                );
            }
        }
        Ok(category)
    }

    /// `(id, occurrences, cap)` for every capped category in `catalog`.
    pub fn capped_usage(&self, catalog: &EventCatalog) -> Vec<(String, u32, u32)> {
        catalog
            .categories()
            .iter()
            .filter_map(|c| c.max_occurrences.map(|max| (c.id.clone(), self.count(&c.id), max)))
            .collect()
    }
}

/// Built-in catalogs used when no configuration overrides them.
pub mod builtin {
    use super::*;

    /// Maximum occurrences for each thunder category.
    pub const THUNDER_CAP: u32 = 2;

    /// The gentle prelude.
    pub fn mist_categories() -> Vec<Category> {
        vec![
            Category::new("soft_veil", "soft veil", 0.50, IntensityRange::new(0.001, 0.008)),
            Category::new("cool_breath", "cool breath", 0.35, IntensityRange::new(0.008, 0.015)),
            Category::new("dew_kiss", "dew kiss", 0.15, IntensityRange::new(0.015, 0.025)),
        ]
    }

    /// Rain shocks, with rare capped thunder.
    pub fn shock_categories() -> Vec<Category> {
        vec![
            Category::new("gentle_tap", "gentle tap", 0.50, IntensityRange::new(0.02, 0.05)),
            Category::new("sharp_hit", "sharp HIT", 0.32, IntensityRange::new(0.05, 0.12)),
            Category::new("cold_spike", "COLD spike", 0.15, IntensityRange::new(0.12, 0.25)),
            Category::new("quick_rumble", "quick rumble", 0.02, IntensityRange::new(0.15, 0.28))
                .with_max_occurrences(THUNDER_CAP),
            Category::new("deep_roll", "deep roll", 0.01, IntensityRange::new(0.25, 0.40))
                .with_max_occurrences(THUNDER_CAP),
        ]
    }

    /// Two-outcome superposition templates.
    pub fn superposition_categories() -> Vec<Category> {
        let range = IntensityRange::new(0.3, 0.9);
        vec![
            Category::new("coin", "a coin in the air", 0.25, range).with_outcomes("heads", "tails"),
            Category::new("door", "a door half-seen", 0.20, range).with_outcomes("open", "closed"),
            Category::new("path", "a forked path", 0.20, range).with_outcomes("left", "right"),
            Category::new("letter", "an unsent letter", 0.15, range).with_outcomes("sent", "kept"),
            Category::new("light", "a beam of light", 0.12, range).with_outcomes("wave", "particle"),
            Category::new("seed", "a buried seed", 0.08, range).with_outcomes("sprouts", "sleeps"),
        ]
    }

    pub fn mist() -> Result<EventCatalog> {
        EventCatalog::new("mist", mist_categories())
    }

    pub fn shock() -> Result<EventCatalog> {
        EventCatalog::new("shock", shock_categories())
    }

    pub fn superposition() -> Result<EventCatalog> {
        EventCatalog::superposition("superposition", superposition_categories())
    }
}
