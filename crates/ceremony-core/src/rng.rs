//! Random variate provider.
//!
//! Every random draw in the engine flows through a [`VariateSource`]. Seed a
//! [`SeededVariates`] for reproducible runs, or script the exact unit draws
//! with [`ScriptedVariates`] when a test needs to pin a particular branch.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{CeremonyError, Result};

/// Source of uniform, exponential and weighted-categorical draws.
///
/// Only [`unit`](VariateSource::unit) is required; everything else is derived
/// from it, so all draws are independent given an independent unit stream.
pub trait VariateSource {
    /// A uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// A uniform draw in `[lo, hi)`. Returns `lo` when the range is empty.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * self.unit()
    }

    /// Exponentially distributed gap with mean `1 / rate`.
    ///
    /// A zero rate never arrives and yields infinity.
    fn exponential_interval(&mut self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -(1.0 - self.unit()).ln() / rate
    }

    /// Bernoulli trial: returns true with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Index `i` with probability `weights[i] / sum(weights)`.
    fn weighted_index(&mut self, weights: &[f64]) -> Result<usize> {
        if weights.is_empty() {
            return Err(CeremonyError::distribution("no candidates to choose from"));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(CeremonyError::distribution(format!(
                "weight {} is not a finite non-negative number",
                bad
            )));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(CeremonyError::distribution("all candidate weights are zero"));
        }

        let roll = self.unit() * total;
        let mut cumulative = 0.0;
        for (i, &w) in weights.iter().enumerate() {
            cumulative += w;
            if roll < cumulative {
                return Ok(i);
            }
        }

        // Rounding can leave roll == total; fall back to the last positive weight
        Ok(weights.iter().rposition(|w| *w > 0.0).unwrap_or(weights.len() - 1))
    }
}

impl<V: VariateSource + ?Sized> VariateSource for &mut V {
    fn unit(&mut self) -> f64 {
        (**self).unit()
    }
}

/// Picks one of `items` with probability proportional to its weight.
pub fn weighted_choice<'a, T, R>(rng: &mut R, items: &'a [T], weights: &[f64]) -> Result<&'a T>
where
    R: VariateSource + ?Sized,
{
    if items.len() != weights.len() {
        return Err(CeremonyError::distribution(format!(
            "{} items but {} weights",
            items.len(),
            weights.len()
        )));
    }
    let index = rng.weighted_index(weights)?;
    Ok(&items[index])
}

/// Seedable production source backed by `SmallRng`.
#[derive(Debug, Clone)]
pub struct SeededVariates {
    rng: SmallRng,
}

impl SeededVariates {
    /// Deterministic stream for the given seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Non-reproducible stream seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl VariateSource for SeededVariates {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of unit draws, cycling when exhausted.
///
/// Useful for pinning a specific branch in tests.
#[derive(Debug, Clone)]
pub struct ScriptedVariates {
    draws: Vec<f64>,
    cursor: usize,
}

impl ScriptedVariates {
    /// Creates a source replaying `draws`. Values are clamped into `[0, 1)`;
    /// an empty script always yields 0.
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        let draws = draws
            .into()
            .into_iter()
            .map(|d| d.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        Self { draws, cursor: 0 }
    }

    /// A source whose every draw is `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl VariateSource for ScriptedVariates {
    fn unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let value = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        value
    }
}
