//! Phase and Variant Types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A ceremony phase, in the order the driver runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Optional low-intensity warm-up
    Ambient,
    /// Main phase
    Active,
    /// Fixed-length wind-down
    Closing,
}

impl Phase {
    /// All phases in run order.
    pub const ALL: [Phase; 3] = [Phase::Ambient, Phase::Active, Phase::Closing];

    /// Decay mode used while this phase runs.
    pub fn decay_mode(self) -> DecayMode {
        match self {
            Phase::Ambient => DecayMode::Ambient,
            Phase::Active | Phase::Closing => DecayMode::Active,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Ambient => write!(f, "ambient"),
            Phase::Active => write!(f, "active"),
            Phase::Closing => write!(f, "closing"),
        }
    }
}

/// Selects which decay rate applies to a decay tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayMode {
    /// Mist phase
    Ambient,
    /// Shock phase
    Active,
}

/// Which resolution strategy a ceremony runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Discrete superpositions collapsing into one of two outcomes
    Collapse,
    /// Continuous affect state perturbed and relaxed toward baseline
    #[default]
    Decay,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::Collapse => write!(f, "collapse"),
            VariantKind::Decay => write!(f, "decay"),
        }
    }
}

/// Error returned when a variant name is not recognised.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseVariantError(pub String);

impl fmt::Display for ParseVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}', expected 'collapse' or 'decay'", self.0)
    }
}

impl std::error::Error for ParseVariantError {}

impl FromStr for VariantKind {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collapse" => Ok(VariantKind::Collapse),
            "decay" => Ok(VariantKind::Decay),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}
