//! Thematic resonance between a free-text intention and catalog categories.
//!
//! Resonance is decoration. It flags records as "echoing" the intention with
//! a probability that depends on whether the category is in the intention's
//! bias set, and it never touches which outcome a superposition collapses to.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CeremonyError, Result};
use crate::rng::VariateSource;

/// Echo probability when the category is in the bias set.
pub const DEFAULT_P_HIGH: f64 = 0.55;

/// Echo probability otherwise.
pub const DEFAULT_P_LOW: f64 = 0.12;

/// Normalized intention tokens.
pub type TokenSet = BTreeSet<String>;

/// Lowercases, splits on whitespace and strips surrounding punctuation.
///
/// Empty input (or input made only of punctuation) yields an empty set.
pub fn tokenize(text: &str) -> TokenSet {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

/// A user intention, tokenized once at ceremony start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intention {
    text: String,
    tokens: TokenSet,
}

impl Intention {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }
}

/// Maps intention tokens to the categories they bias toward.
#[derive(Debug, Clone, PartialEq)]
pub struct ResonanceMap {
    links: BTreeMap<String, BTreeSet<String>>,
    p_high: f64,
    p_low: f64,
}

impl Default for ResonanceMap {
    fn default() -> Self {
        Self {
            links: BTreeMap::new(),
            p_high: DEFAULT_P_HIGH,
            p_low: DEFAULT_P_LOW,
        }
    }
}

impl ResonanceMap {
    /// An empty map with the default echo probabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the echo probabilities; both must lie in `[0, 1]`.
    pub fn with_probabilities(mut self, p_high: f64, p_low: f64) -> Result<Self> {
        for (name, p) in [("p_high", p_high), ("p_low", p_low)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CeremonyError::config(format!(
                    "resonance {} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        self.p_high = p_high;
        self.p_low = p_low;
        Ok(self)
    }

    /// Links `token` (normalized the same way intentions are) to categories.
    pub fn link<I, S>(mut self, token: &str, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(key) = tokenize(token).into_iter().next() {
            self.links
                .entry(key)
                .or_default()
                .extend(categories.into_iter().map(Into::into));
        }
        self
    }

    pub fn p_high(&self) -> f64 {
        self.p_high
    }

    pub fn p_low(&self) -> f64 {
        self.p_low
    }

    /// Category ids referenced by any token.
    pub fn referenced_categories(&self) -> BTreeSet<&str> {
        self.links
            .values()
            .flat_map(|set| set.iter().map(String::as_str))
            .collect()
    }

    /// Union of every token's linked categories; unknown tokens add nothing.
    pub fn bias_for(&self, tokens: &TokenSet) -> BTreeSet<String> {
        tokens
            .iter()
            .filter_map(|t| self.links.get(t))
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    /// Echo probability that applies to `category_id` under `tokens`.
    pub fn echo_probability(&self, category_id: &str, tokens: &TokenSet) -> f64 {
        let biased = tokens
            .iter()
            .filter_map(|t| self.links.get(t))
            .any(|set| set.contains(category_id));
        if biased {
            self.p_high
        } else {
            self.p_low
        }
    }

    /// Draws whether a record of `category_id` echoes the intention.
    pub fn echoes<R: VariateSource + ?Sized>(
        &self,
        category_id: &str,
        tokens: &TokenSet,
        rng: &mut R,
    ) -> bool {
        rng.chance(self.echo_probability(category_id, tokens))
    }

    /// Links for the built-in superposition templates.
    pub fn builtin() -> Self {
        Self::new()
            .link("love", ["letter", "door"])
            .link("hope", ["seed", "light"])
            .link("courage", ["path", "door"])
            .link("change", ["path", "coin", "seed"])
            .link("luck", ["coin"])
            .link("clarity", ["light"])
            .link("home", ["door", "letter"])
            .link("growth", ["seed"])
            .link("choice", ["path", "coin"])
            .link("peace", ["light", "letter"])
    }
}
