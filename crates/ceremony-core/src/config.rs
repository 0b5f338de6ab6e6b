//! Configuration loading for the ceremony engine.
//!
//! Every setting can come from a TOML file; any section or key left out falls
//! back to the built-in defaults.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ceremony_events::{Category, VariantKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{builtin, EventCatalog};
use crate::decay::DecayConfig;
use crate::driver::PhasePlan;
use crate::error::{CeremonyError, Result};
use crate::population::PopulationConfig;
use crate::resonance::{Intention, ResonanceMap, DEFAULT_P_HIGH, DEFAULT_P_LOW};
use crate::rng::SeededVariates;
use crate::variant::{CollapseCeremony, DecayCeremony};

/// Complete ceremony configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CeremonyConfig {
    /// Variant, pacing and phase budgets
    #[serde(default)]
    pub ceremony: GeneralConfig,
    /// Discrete variant tuning
    #[serde(default)]
    pub population: PopulationConfig,
    /// Continuous variant tuning
    #[serde(default)]
    pub decay: DecayConfig,
    /// Intention echo tuning
    #[serde(default)]
    pub resonance: ResonanceConfig,
    /// Catalog overrides
    #[serde(default)]
    pub catalogs: CatalogConfig,
}

impl CeremonyConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, TomlSerializeError> {
        toml::to_string_pretty(self).map_err(TomlSerializeError)
    }

    /// Runs every configuration check. Nothing is simulated until this passes.
    pub fn validate(&self) -> Result<()> {
        self.plan()?;
        self.population.validate()?;
        self.decay.validate()?;
        self.resonance_map()?;
        match self.ceremony.variant {
            VariantKind::Collapse => {
                self.closing()?;
                self.superposition_catalog()?;
            }
            VariantKind::Decay => {
                self.mist_catalog()?;
                self.shock_catalog()?;
            }
        }
        Ok(())
    }

    /// Phase budgets and pacing.
    pub fn plan(&self) -> Result<PhasePlan> {
        let general = &self.ceremony;
        let plan = PhasePlan {
            ambient: seconds("ambient_secs", general.ambient_secs)?,
            active: seconds("active_secs", general.active_secs)?,
            tick_interval: Duration::from_millis(general.tick_interval_ms),
            phase_gap: seconds("phase_gap_secs", general.phase_gap_secs)?,
        };
        plan.validate()?;
        Ok(plan)
    }

    /// Closing budget for the discrete variant.
    pub fn closing(&self) -> Result<Duration> {
        seconds("closing_secs", self.ceremony.closing_secs)
    }

    pub fn intention(&self) -> Option<Intention> {
        self.ceremony.intention.as_deref().map(Intention::new)
    }

    /// Seeded source when a seed is set, entropy otherwise.
    pub fn variates(&self) -> SeededVariates {
        match self.ceremony.seed {
            Some(seed) => SeededVariates::from_seed(seed),
            None => SeededVariates::from_entropy(),
        }
    }

    pub fn superposition_catalog(&self) -> Result<EventCatalog> {
        let categories = self
            .catalogs
            .superposition
            .clone()
            .unwrap_or_else(builtin::superposition_categories);
        EventCatalog::superposition("superposition", categories)
    }

    pub fn mist_catalog(&self) -> Result<EventCatalog> {
        let categories = self.catalogs.mist.clone().unwrap_or_else(builtin::mist_categories);
        EventCatalog::new("mist", categories)
    }

    pub fn shock_catalog(&self) -> Result<EventCatalog> {
        let categories = self.catalogs.shock.clone().unwrap_or_else(builtin::shock_categories);
        EventCatalog::new("shock", categories)
    }

    /// Token links from `[resonance.tokens]`, or the built-in links.
    pub fn resonance_map(&self) -> Result<ResonanceMap> {
        let map = match &self.resonance.tokens {
            Some(tokens) => tokens
                .iter()
                .fold(ResonanceMap::new(), |map, (token, categories)| {
                    map.link(token, categories.iter().cloned())
                }),
            None => ResonanceMap::builtin(),
        };
        map.with_probabilities(self.resonance.p_high, self.resonance.p_low)
    }

    pub fn collapse_ceremony(&self) -> Result<CollapseCeremony> {
        CollapseCeremony::new(
            self.superposition_catalog()?,
            self.resonance_map()?,
            self.intention(),
            self.population,
            self.closing()?,
        )
    }

    pub fn decay_ceremony(&self) -> Result<DecayCeremony> {
        DecayCeremony::new(self.mist_catalog()?, self.shock_catalog()?, self.decay.clone())
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        CeremonyError::config(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        ))
    })
}

/// Variant selection, seed and phase budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Which ceremony to run
    pub variant: VariantKind,
    /// Seed for reproducible runs; entropy when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Target interval between ticks
    pub tick_interval_ms: u64,
    /// Ambient phase budget; zero skips the phase
    pub ambient_secs: f64,
    /// Active phase budget
    pub active_secs: f64,
    /// Closing phase budget for the discrete variant
    pub closing_secs: f64,
    /// Silence between phases
    pub phase_gap_secs: f64,
    /// Records in each summary ranking
    pub top_n: usize,
    /// Free-text intention for resonance echoes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            variant: VariantKind::default(),
            seed: None,
            tick_interval_ms: 50,
            ambient_secs: 15.0,
            active_secs: 35.0,
            closing_secs: 10.0,
            phase_gap_secs: 2.0,
            top_n: 5,
            intention: None,
        }
    }
}

/// Echo probabilities and token links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    /// Echo probability for biased categories
    pub p_high: f64,
    /// Echo probability for everything else
    pub p_low: f64,
    /// Token to category ids; built-in links when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            p_high: DEFAULT_P_HIGH,
            p_low: DEFAULT_P_LOW,
            tokens: None,
        }
    }
}

/// Catalog overrides. Any list left out uses the built-in catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superposition: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mist: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shock: Option<Vec<Category>>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error that can occur during TOML serialization.
#[derive(Debug, Error)]
#[error("TOML serialize error: {0}")]
pub struct TomlSerializeError(#[source] pub toml::ser::Error);

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Ceremony Configuration

[ceremony]
variant = "decay"
# seed = 42
tick_interval_ms = 50
ambient_secs = 15.0
active_secs = 35.0
closing_secs = 10.0
phase_gap_secs = 2.0
top_n = 5
# intention = "courage and change"

[population]
capacity = 12
arrival_rate = 1.2
collapse_probability = 0.03

[decay]
baseline = 1.0
ambient_decay = 0.98
active_decay = 0.95
decay_ticks_per_second = 20.0
shock_threshold = 0.02
ambient_rate = 2.5
active_rate = 0.5
ambient_chaos = 0.15
active_chaos = 0.5
active_upward_skew = 1.5
burst_probability = 0.12
burst_factors = [0.1, 3.5]
relief_pause_secs = 2.0

[[decay.reliefs]]
name = "Emerging Light"
intensity = -0.18

[[decay.reliefs]]
name = "Warming Rays"
intensity = -0.32

[[decay.reliefs]]
name = "Rainbow Serenity"
intensity = -0.45

[resonance]
p_high = 0.55
p_low = 0.12

# [resonance.tokens]
# luck = ["coin"]

# [[catalogs.shock]]
# id = "gentle_tap"
# display_name = "Gentle Tap"
# weight = 1.0
# intensity_range = { min = 0.02, max = 0.05 }
"#
    .to_string()
}
