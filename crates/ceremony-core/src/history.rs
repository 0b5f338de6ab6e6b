//! Append-only ceremony history.
//!
//! Records are kept in the order they were resolved or applied. Summary
//! queries sort copies of references and never reorder the stored sequence.

use std::collections::HashMap;

use ceremony_events::{AppliedEventRecord, CeremonyTimestamp, ResolutionRecord};
use serde::Serialize;

/// Common view over the record types a history can hold.
pub trait HistoryRecord {
    fn timestamp(&self) -> CeremonyTimestamp;
    fn category_id(&self) -> &str;
    fn label(&self) -> &str;
    fn intensity(&self) -> f64;
}

impl HistoryRecord for ResolutionRecord {
    fn timestamp(&self) -> CeremonyTimestamp {
        self.timestamp
    }

    fn category_id(&self) -> &str {
        &self.category_id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }
}

impl HistoryRecord for AppliedEventRecord {
    fn timestamp(&self) -> CeremonyTimestamp {
        self.timestamp
    }

    fn category_id(&self) -> &str {
        &self.category_id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }
}

/// Occurrences of one category in a history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category_id: String,
    pub label: String,
    pub count: usize,
    /// Percentage of all records
    pub percent: f64,
}

/// Insertion-ordered record log.
#[derive(Debug, Clone)]
pub struct HistoryLog<T> {
    records: Vec<T>,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

impl<T: HistoryRecord> HistoryLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record at the end.
    pub fn append(&mut self, record: T) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.records.last()
    }

    /// The `n` records with the greatest `|intensity|`, ties broken by the
    /// earliest timestamp.
    pub fn top_by_intensity(&self, n: usize) -> Vec<&T> {
        self.top_by(n, |_| true, |r| r.intensity().abs())
    }

    /// The `n` records matching `filter` with the greatest `key`, ties broken
    /// by the earliest timestamp.
    pub fn top_by<F, K>(&self, n: usize, filter: F, key: K) -> Vec<&T>
    where
        F: Fn(&T) -> bool,
        K: Fn(&T) -> f64,
    {
        let mut picked: Vec<&T> = self.records.iter().filter(|r| filter(*r)).collect();
        // Stable sort keeps insertion order for records sharing a timestamp
        picked.sort_by(|a, b| {
            key(*b)
                .total_cmp(&key(*a))
                .then_with(|| a.timestamp().cmp(&b.timestamp()))
        });
        picked.truncate(n);
        picked
    }

    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.records.iter().filter(|r| predicate(*r)).count()
    }

    /// Per-category counts, most frequent first (ties by first appearance).
    pub fn distribution(&self) -> Vec<CategoryCount> {
        let mut order: Vec<(&str, &str)> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.records {
            let id = record.category_id();
            let count = counts.entry(id).or_insert(0);
            if *count == 0 {
                order.push((id, record.label()));
            }
            *count += 1;
        }

        let total = self.records.len();
        let mut out: Vec<CategoryCount> = order
            .into_iter()
            .map(|(id, label)| {
                let count = counts.get(id).copied().unwrap_or(0);
                CategoryCount {
                    category_id: id.to_string(),
                    label: label.to_string(),
                    count,
                    percent: count as f64 / total as f64 * 100.0,
                }
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }
}

impl<'a, T> IntoIterator for &'a HistoryLog<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
