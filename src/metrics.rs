//! Metrics sink used by the semantic checkers.

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Outcome suffix recorded for every semantic check.
pub const OUTCOME_CHECKED: &str = "checked";
/// Outcome suffix recorded for every failed semantic check.
pub const OUTCOME_INVALID: &str = "invalid";

/// Counter sink. Implementations must tolerate concurrent increments from
/// many validator calls.
pub trait Metrics: Send + Sync {
    fn inc_counter(&self, key: &str);
}

/// Discards every increment.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn inc_counter(&self, _key: &str) {}
}

/// In-memory counters, safe to share between threads.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    counters: DashMap<String, u64>,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter; unknown keys read as zero.
    pub fn get(&self, key: &str) -> u64 {
        self.counters.get(key).map(|v| *v).unwrap_or(0)
    }

    /// Point-in-time copy of all counters, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

impl Metrics for CounterMetrics {
    fn inc_counter(&self, key: &str) {
        *self.counters.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Key of the counter for one semantic check outcome, e.g.
/// `ingress.validation.filters.invalid`.
pub fn validation_key(resource_type: &str, check: &str, outcome: &str) -> String {
    format!("{}.validation.{}.{}", resource_type, check, outcome)
}
