//! Closing summaries handed to renderers at run end.

use ceremony_events::{AppliedEventRecord, Entity, ResolutionRecord, VariantKind};
use serde::Serialize;

use crate::history::CategoryCount;

/// Driver-level facts shared by both variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub ticks: u64,
    pub elapsed_secs: f64,
    /// Observer callbacks that failed and were skipped
    pub presentation_failures: usize,
}

/// Usage of one capped category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedUsage {
    pub category_id: String,
    pub occurrences: u32,
    pub max: u32,
}

/// How often each outcome was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeCount {
    pub outcome: String,
    pub count: usize,
}

/// End-of-run view of a collapse ceremony.
#[derive(Debug, Clone, Serialize)]
pub struct CollapseSummary {
    pub variant: VariantKind,
    /// Records in the history
    pub total_count: usize,
    /// Superpositions still unresolved
    pub active_remaining: usize,
    pub arrivals: usize,
    pub resolutions: usize,
    pub echoed: usize,
    pub intention: Option<String>,
    pub top_records: Vec<ResolutionRecord>,
    pub distribution: Vec<CategoryCount>,
    pub outcomes: Vec<OutcomeCount>,
    pub unresolved: Vec<Entity>,
    pub run: RunStats,
}

/// End-of-run view of a decay ceremony.
#[derive(Debug, Clone, Serialize)]
pub struct DecaySummary {
    pub variant: VariantKind,
    /// Records in the history
    pub total_count: usize,
    pub ambient_events: usize,
    pub active_events: usize,
    pub relief_events: usize,
    /// Active events that crossed the announcement threshold
    pub announced_events: usize,
    pub capped: Vec<CappedUsage>,
    pub net_accumulation: f64,
    pub final_state: f64,
    pub baseline: f64,
    pub displacement: f64,
    pub top_records: Vec<AppliedEventRecord>,
    pub most_intense: Vec<AppliedEventRecord>,
    pub most_relieving: Vec<AppliedEventRecord>,
    pub distribution: Vec<CategoryCount>,
    pub run: RunStats,
}

impl DecaySummary {
    /// True when the run ended below baseline.
    pub fn lingering_calm(&self) -> bool {
        self.displacement < 0.0
    }
}
